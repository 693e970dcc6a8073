// ABOUTME: Error taxonomy — hard (syntax) errors, soft (resource) errors, and session-level failures

use thiserror::Error;

/// A syntax ("hard") error: malformed input. Carries no position itself —
/// the `Cursor` attaches the position at the moment the error is raised,
/// and keeps only the first one (first cursor is most informative).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("variable is expected after a separator")]
    VarExpected,
    #[error("'>' should be followed by '='")]
    GreaterNeedsEq,
    #[error("'<' should be followed by '='")]
    LessNeedsEq,
    #[error("in an Ingleton expression a variable list is expected here")]
    IngletonVar,
    #[error("in an Ingleton expression a separator is expected here")]
    IngletonSep,
    #[error("in an Ingleton expression a closing ']' is missing here")]
    IngletonClose,
    #[error("'(' should be followed by a variable list")]
    CondExpr,
    #[error("variable list is missing after '|'")]
    MissingConditioning,
    #[error("closing parenthesis ')' is expected here")]
    Closing,
    #[error("either a list separator or '|' is expected here")]
    CommaOrBar,
    #[error("a closing ')', the list separator, or '|' is expected here")]
    MacroArgSep,
    #[error("variable list is expected here")]
    VarList,
    #[error("either '+' or '-' is expected here")]
    PlusOrMinus,
    #[error("only one relation is allowed in an expression")]
    DoubleRelation,
    #[error("use '==' to separate the expressions")]
    DiffUseEq,
    #[error("use '=', '<=' or '>=' to separate the two sides")]
    DblEqRelation,
    #[error("unrecognized character")]
    WrongItem,
    #[error("constant before or after the relation sign must be zero")]
    NotHomogeneous,
    #[error("multiplication symbol '*' at a wrong place")]
    WrongAsterisk,
    #[error("no constants allowed")]
    ExtraNum,
    #[error("extra characters at the end")]
    ExtraText,
    #[error("no expression is given")]
    Empty,
    #[error("there must be an '=', '<=' or '>=' somewhere")]
    NoRelation,
    #[error("no expression after '=', '<=' or '>='")]
    NoRhs,
    #[error("no macro with this name is defined")]
    NoMacro,
    #[error("no macro with this name and pattern is defined")]
    NoMacroArg,
    #[error("only macro arguments can be used as variables")]
    IdInMacro,
    #[error("no relation is allowed in a macro definition")]
    NoRelInMacro,
    #[error("macro definition starts with the macro name followed by '('")]
    MacroDefName,
    #[error("missing argument: a single variable is expected here")]
    MacroDefNoParam,
    #[error("standard entropy functions cannot be redefined")]
    MacroDefStandard,
    #[error("this type of macro is already defined; delete it first")]
    MacroDefDuplicate,
    #[error("all arguments must be different")]
    MacroDefSameParam,
    #[error("a ')', a list separator, or '|' is expected here")]
    MacroDefParamSep,
    #[error("this argument is not used in the final macro text")]
    MacroDefUnused,
    #[error("macro text should start with an '=' symbol")]
    MacroDefNoEq,
    #[error("the macro text simplifies to 0, not stored")]
    MacroDefSimplifiesToZero,
    #[error("no match was found")]
    MacroDeleteNoMatch,
    #[error("the first variable set is always a function of the other - cannot be independent")]
    FuncEqual,
    #[error("the {0} part is a function of the others - cannot be independent")]
    IndependenceFunctionOf(String),
    #[error("all coefficients are zero")]
    AllZero,
    #[error("a Markov chain must contain at least three tags")]
    MarkovTooShort,
    #[error("fewer than two variables after compaction")]
    TooFewVariables,
}

/// A resource ("soft") error: a configured bound was exceeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("too many different random variables")]
    TooManyVariables,
    #[error("too long identifier")]
    TooLongIdentifier,
    #[error("the expanded expression is too long")]
    TooLongExpression,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("cannot add more macros, the maximum has been reached")]
    TooManyMacros,
    #[error("cannot add more constraints, the maximum has been reached")]
    TooManyConstraints,
}

/// Outcome of a parse that succeeded but carries no LP-checkable content:
/// a trivially-true/false simplification the spec requires to short-circuit
/// the LP call and be reported as an informative message instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `Eq` expression collapsed to no terms: "0 = 0".
    SimplifiesToEqZero,
    /// `Ge` expression collapsed to no terms: "0 <= 0".
    SimplifiesToGeZero,
    /// `Ge` expression with every surviving coefficient >= 0.
    PositiveCombination,
    /// Exactly one surviving term: no check is performed.
    SingleTerm(String),
}

/// Two independent write-once slots, mirroring `syntax_error` in the
/// upstream parser: a hard error and a soft error can both be recorded for
/// the same parse, and each keeps only its first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostic {
    pub hard: Option<(ParseError, usize)>,
    pub soft: Option<(ResourceError, usize)>,
}

impl Diagnostic {
    pub fn record_hard(&mut self, err: ParseError, pos: usize) {
        if self.hard.is_none() {
            self.hard = Some((err, pos));
        }
    }

    pub fn record_soft(&mut self, err: ResourceError, pos: usize) {
        if self.soft.is_none() {
            self.soft = Some((err, pos));
        }
    }

    pub fn has_error(&self) -> bool {
        self.hard.is_some() || self.soft.is_some()
    }

    pub fn clear(&mut self) {
        self.hard = None;
        self.soft = None;
    }

    /// Renders the first error (hard takes precedence, matching the
    /// upstream reporting order) with a `----^` cursor underline.
    pub fn render(&self, source: &str) -> Option<String> {
        let (msg, pos) = if let Some((e, p)) = &self.hard {
            (e.to_string(), *p)
        } else if let Some((e, p)) = &self.soft {
            (e.to_string(), *p)
        } else {
            return None;
        };
        let underline: String = "-".repeat(pos) + "^";
        Some(format!("{source}\n{underline}\n{msg}"))
    }
}

/// A `ParseError` bundled with the position it was raised at, for contexts
/// (e.g. constraint re-parsing during a check) that need to propagate a
/// single error value rather than a whole `Diagnostic`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} at position {1}")]
pub struct ParseErrorWithPos(pub ParseError, pub usize);

/// Errors that can occur driving a whole session (solver I/O, config I/O).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseErrorWithPos),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("solver error: {0}")]
    Solver(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
