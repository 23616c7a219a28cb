//! Diagnostics shared by both interpreter paths.
//!
//! Every phase of the pipeline (scanning, parsing, resolving, compiling,
//! running) reports through the same [`Diagnostics`] sink so that the CLI
//! driver and the REPL see one consistent `[line N] Error...: message`
//! format regardless of which engine produced it.

use std::fmt;

/// Where in the source an error was anchored, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Past the last token.
    AtEof,
    /// At a specific lexeme.
    AtToken(String),
    /// No useful anchor (e.g. a runtime error already carries its own line).
    Pure,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::AtEof => write!(f, " at end"),
            Location::AtToken(lexeme) => write!(f, " at '{lexeme}'"),
            Location::Pure => Ok(()),
        }
    }
}

/// A single reportable problem, tagged with the line it occurred on.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: u32,
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] Error{}: {}",
            self.line, self.location, self.message
        )
    }
}

/// Lexical errors raised by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    UnexpectedCharacter(char),
    UnterminatedString,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::UnexpectedCharacter(c) => write!(f, "Unexpected character: {c}"),
            ScanError::UnterminatedString => write!(f, "Unterminated string."),
        }
    }
}

impl std::error::Error for ScanError {}

/// Grammar errors raised by the recursive-descent parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    ExpectedExpression,
    ExpectedToken { expected: String },
    InvalidAssignmentTarget,
    TooManyArguments,
    TooManyParameters,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::ExpectedExpression => write!(f, "Expect expression."),
            ParseError::ExpectedToken { expected } => write!(f, "Expect {expected}."),
            ParseError::InvalidAssignmentTarget => write!(f, "Invalid assignment target."),
            ParseError::TooManyArguments => write!(f, "Can't have more than 255 arguments."),
            ParseError::TooManyParameters => write!(f, "Can't have more than 255 parameters."),
        }
    }
}

impl std::error::Error for ParseError {}

/// Static scope errors raised by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    AlreadyDeclared(String),
    ReturnFromTopLevel,
    ReturnFromInitializer,
    ThisOutsideClass,
    SuperOutsideClass,
    SuperWithoutSuperclass,
    SelfInheritance(String),
    ReadOwnInitializer(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::AlreadyDeclared(name) => {
                write!(f, "Already a variable with this name in this scope: {name}.")
            }
            ResolveError::ReturnFromTopLevel => write!(f, "Can't return from top-level code."),
            ResolveError::ReturnFromInitializer => {
                write!(f, "Can't return a value from an initializer.")
            }
            ResolveError::ThisOutsideClass => write!(f, "Can't use 'this' outside of a class."),
            ResolveError::SuperOutsideClass => write!(f, "Can't use 'super' outside of a class."),
            ResolveError::SuperWithoutSuperclass => {
                write!(f, "Can't use 'super' in a class with no superclass.")
            }
            ResolveError::SelfInheritance(name) => write!(f, "A class can't inherit from itself: {name}."),
            ResolveError::ReadOwnInitializer(_) => {
                write!(f, "Can't read local variable in its own initializer.")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Errors raised while compiling source into a [`crate::bytecode::chunk::Chunk`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    ExpectedExpression,
    ExpectedToken { expected: String },
    TooManyConstants,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::ExpectedExpression => write!(f, "Expect expression."),
            CompileError::ExpectedToken { expected } => write!(f, "Expect {expected}."),
            CompileError::TooManyConstants => write!(f, "Too many constants in one chunk."),
        }
    }
}

impl std::error::Error for CompileError {}

/// Errors raised during evaluation, on either path.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    NotANumber,
    NotNumbers,
    NotTwoNumbersOrStrings,
    NotCallable,
    UndefinedVariable(String),
    UndefinedProperty(String),
    OnlyInstancesHaveFields,
    OnlyInstancesHaveProperties,
    WrongArity { expected: usize, got: usize },
    SuperclassMustBeClass,
    StackOverflow,
    StackUnderflow,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NotANumber => write!(f, "Operand must be a number."),
            RuntimeError::NotNumbers => write!(f, "Operands must be numbers."),
            RuntimeError::NotTwoNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            RuntimeError::NotCallable => write!(f, "Can only call functions and classes."),
            RuntimeError::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            RuntimeError::UndefinedProperty(name) => write!(f, "Undefined property '{name}'."),
            RuntimeError::OnlyInstancesHaveFields => write!(f, "Only instances have fields."),
            RuntimeError::OnlyInstancesHaveProperties => {
                write!(f, "Only instances have properties.")
            }
            RuntimeError::WrongArity { expected, got } => write!(
                f,
                "Expected {expected} arguments but got {got}."
            ),
            RuntimeError::SuperclassMustBeClass => write!(f, "Superclass must be a class."),
            RuntimeError::StackOverflow => write!(f, "Stack overflow."),
            RuntimeError::StackUnderflow => write!(f, "Stack underflow."),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Sink that both the library entry points and the CLI driver report
/// through, tracking whether a static or runtime error has occurred so the
/// caller can pick the right process exit code.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Reset the static-error flag; called by the REPL between lines.
    pub fn reset(&mut self) {
        self.had_error = false;
    }

    pub fn report_static(&mut self, line: u32, location: Location, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            line,
            location,
            message: message.into(),
        };
        eprintln!("{diagnostic}");
        self.had_error = true;
    }

    pub fn report_runtime(&mut self, line: u32, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            line,
            location: Location::Pure,
            message: message.into(),
        };
        eprintln!("{diagnostic}");
        self.had_runtime_error = true;
    }

    /// Like [`Self::report_runtime`], but anchored to the offending token's
    /// lexeme, matching a static error's `at '...'` rendering.
    pub fn report_runtime_at(&mut self, line: u32, lexeme: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            line,
            location: Location::AtToken(lexeme.into()),
            message: message.into(),
        };
        eprintln!("{diagnostic}");
        self.had_runtime_error = true;
    }
}
