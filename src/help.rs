// ABOUTME: Help and syntax text for the `help`/`syntax`/`about`/`args` commands

use std::collections::HashMap;
use std::sync::OnceLock;

/// One topic's help text, keyed by the first word of the command it
/// documents (e.g. `"check"`, `"macro"`, `"set"`).
struct Topic {
    text: &'static str,
}

fn topics() -> &'static HashMap<&'static str, Topic> {
    static TOPICS: OnceLock<HashMap<&'static str, Topic>> = OnceLock::new();
    TOPICS.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("help", Topic { text:
"help [TOPIC]       show this list, or detailed help on TOPIC
check EXPR          (or just EXPR) check EXPR against the active constraints
test EXPR            synonym for 'check'
xcheck EXPR          check EXPR ignoring the active constraints
add CONSTR           add CONSTR to the active constraint list
list [RANGE|all]    list active constraints (default: all)
del [N|all]          delete constraint N, or all constraints
zap EXPR1==EXPR2     print the algebraic simplification of EXPR1-EXPR2
macro add|list|del   define, list, or delete a macro
run FILE             execute commands from FILE
style [full|simple [C]]   switch surface syntax, or report the current one
syntax [TOPIC]       grammar help (entropy, constraint, macro, ingleton)
set [NAME=VALUE]     show or change a runtime parameter
dump FILE            write macros and constraints to FILE as a runnable script
save [FILE]          save command history
about                 version and one-line description
args                  command-line flag summary
quit                  leave minitip" });
        m.insert("check", Topic { text:
"check EXPR  (or just type EXPR with no leading command)

Checks whether EXPR is a consequence of the elemental Shannon inequalities
conjoined with every constraint in the active list (see 'list'). EXPR is a
relation: two sides joined by '=', '<=', or '>=', each side a signed sum of
entropy terms. Prints TRUE, FALSE, or a trivial-case message." });
        m.insert("xcheck", Topic { text:
"xcheck EXPR

Like 'check', but the active constraint list is ignored: EXPR is checked
against the bare elemental Shannon inequalities only." });
        m.insert("add", Topic { text:
"add CONSTR

Adds CONSTR to the active constraint list, verbatim; it is re-parsed on
every subsequent 'check'. CONSTR is one of:
  V1 : V2        functional dependency (V1 is a function of V2)
  V1.V2.V3...    total independence
  V1/V2/V3...    Markov chain (also 'V1->V2->V3')
  a relation, exactly as in 'check'" });
        m.insert("list", Topic { text:
"list [RANGE|all]

Lists constraints in the active list, numbered from 1. RANGE is a
comma-separated list of indices and/or 'a-b' ranges; omitted or 'all'
lists every constraint." });
        m.insert("del", Topic { text:
"del N
del all

Deletes constraint number N (as shown by 'list'), or every constraint." });
        m.insert("zap", Topic { text:
"zap EXPR1==EXPR2

Prints the canonical H(...)-form of EXPR1 minus EXPR2, with no truth
judgement -- pure algebraic simplification ('diff' mode)." });
        m.insert("macro", Topic { text:
"macro add NAME(p1,p2,...)=BODY   define a macro
macro list                        list every macro, standard and user-defined
macro del NAME(p1,p2,...)         delete a user-defined macro

A macro is identified by its name, its arity, and which separators between
its parameters are '|' rather than the list separator; two macros of the
same name can coexist if that signature differs (e.g. M(a,b) and
M(a,b|c)). The four standard macros H(a), H(a|b), I(a;b), I(a;b|c) are
installed at startup and cannot be redefined or deleted." });
        m.insert("run", Topic { text:
"run FILE

Executes each line of FILE as if typed at the prompt. The 'run' setting
('strict' or 'loose') controls whether the first error aborts the file." });
        m.insert("style", Topic { text:
"style                 report the current surface syntax
style full             switch to full syntax: H(a,b|c), I(a;b|c), explicit
                       commas, semicolon conditioning separator
style simple [C]       switch to compact syntax: bare variable lists,
                       bracket forms, separator C (default ',') between
                       the two sides of a mutual-information bracket" });
        m.insert("set", Topic { text:
"set                  list every runtime parameter and its value
set NAME=VALUE       change parameter NAME

Parameters: iterlimit, timelimit, constrlimit, macrolimit, run
(strict|loose), comment (yes|no), abbrev (yes|no), save (yes|no|ask),
simplevar (basic|extended), history." });
        m.insert("dump", Topic { text:
"dump FILE

Writes a self-contained script to FILE: the current style, every
user-defined macro (rendered via 'macro list''s format), and every active
constraint as an 'add' line. 'run'-ning the dumped file reproduces the
state." });
        m.insert("syntax", Topic { text:
"syntax [entropy|constraint|macro|ingleton]

With no argument, a short overview; with a topic, the detailed grammar for
that kind of expression. See also 'help'." });
        m
    })
}

/// `help TOPIC`'s text, falling back to a generic message for an unknown
/// topic (the command dispatcher has no hard-error path here; everything
/// renders as informative text).
pub fn topic_text(topic: &str) -> String {
    let key = topic.trim().split_whitespace().next().unwrap_or("help").to_ascii_lowercase();
    match topics().get(key.as_str()) {
        Some(t) => t.text.to_string(),
        None => format!("no help on '{topic}'; try 'help' for the command list"),
    }
}

/// `syntax TOPIC`'s text: the grammar detail for the atomic-form table,
/// constraint shapes, and macro definitions, grouped by topic.
pub fn syntax_text(topic: &str) -> String {
    let key = topic.trim().to_ascii_lowercase();
    match key.as_str() {
        "" => "\
Two surface syntaxes select with 'style full'/'style simple'.

Compact (simple) syntax, separator ',' by default:
  ab           H(a,b)
  (ab|c)       H(a,b|c) = H(a,b,c)-H(c)
  (a,b)        I(a;b)
  (a,b|c)      I(a;b|c)
  [a,b,c,d]    Ingleton bracket
  M(a,b;c)     macro invocation

Full syntax:
  H(a,b)       joint entropy
  H(a,b|c)     conditional entropy
  I(a;b)       mutual information
  I(a;b|c)     conditional mutual information
  [a;b;c;d]    Ingleton bracket

'syntax entropy', 'syntax constraint', 'syntax macro', or 'syntax ingleton'
for more detail on each."
            .to_string(),
        "entropy" => "\
An entropy expression is a relation: LHS (=|<=|>=) RHS, each side a signed
sum of terms. A term is [sign] [number ['*']] atomic-form, where
atomic-form is a variable list, a (.)/[.]  bracket form, or a macro
invocation. Every term after the first on a side needs an explicit sign;
a bare '0' is allowed on either side of the relation alone."
            .to_string(),
        "constraint" => "\
A constraint line is one of:
  V1 : V2              functional dependency: H(V1,V2) = H(V2)
  V1.V2.V3...           total independence (or 'V1||V2||...')
  V1/V2/V3...           Markov chain, at least 3 links ('V1->V2->...' also
                        accepted)
  any relation          exactly as accepted by 'check'"
            .to_string(),
        "macro" => "\
Name(p1 s1 p2 s2 ...) = body

Name is a single uppercase letter; each parameter is a variable name
under the active style; each separator si is either the list separator
or '|'. body is a signed sum of terms over the parameters only -- no
relation, and every parameter must appear in the simplified body."
            .to_string(),
        "ingleton" => "\
[V1;V2;V3;V4]  (full syntax; compact syntax uses the active list separator)

Shorthand for -I(V1;V2) + I(V1;V2|V3) + I(V1;V2|V4) + I(V3;V4), the
Ingleton expression that is nonnegative for linear (but not all) matroids."
            .to_string(),
        _ => format!("no syntax help on '{topic}'; try 'syntax' with no argument"),
    }
}

/// `about`'s one-line-plus-version text.
pub fn about_text() -> String {
    format!(
        "minitip {} -- a MINImal Tool for Information theoretic inequality Proving\n\
         decides whether a linear entropy expression follows from the elemental\n\
         Shannon inequalities and a set of constraints, via linear programming.",
        crate::config::VERSION
    )
}

/// `args`' command-line flag summary.
pub fn args_text() -> String {
    "\
-h              show command-line help and exit
-v              show version and exit
-s[C]           compact style, optional separator character C (default ',')
-S              full style
-f FILE         history file path
-c FILE         load FILE as the startup config script
-c-             disable startup config script loading
-m DEF          pre-install a macro definition before reading other input
-q              quiet: suppress the startup banner
-e              end of flags: everything after is positional, even if it
                starts with '-'

Positional: [EXPR [CONSTR ...]]. With EXPR given, minitip checks it once
and exits (0 TRUE, 1 FALSE, 2 syntax error, 3 other error) instead of
starting the interactive prompt."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_topic_has_text() {
        assert!(topic_text("check").contains("Shannon"));
    }

    #[test]
    fn unknown_topic_is_reported_gracefully() {
        assert!(topic_text("bogus").contains("no help"));
    }

    #[test]
    fn syntax_overview_mentions_both_styles() {
        assert!(syntax_text("").contains("full"));
        assert!(syntax_text("").contains("simple"));
    }

    #[test]
    fn syntax_topic_lookup() {
        assert!(syntax_text("macro").contains("uppercase"));
    }

    #[test]
    fn about_mentions_version() {
        assert!(about_text().contains(crate::config::VERSION));
    }
}
