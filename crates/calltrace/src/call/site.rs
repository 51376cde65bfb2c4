use serde::Serialize;
use std::fmt;

/// Where a handler lives: declaring type, method and, when known, source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub declaring_type: &'static str,
    pub method: &'static str,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl CallSite {
    /// A call site without source position.
    pub const fn new(declaring_type: &'static str, method: &'static str) -> Self {
        Self {
            declaring_type,
            method,
            file: None,
            line: None,
        }
    }

    /// Attach the source position.
    pub const fn at(mut self, file: &'static str, line: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self
    }
}

/// Renders like a stack frame: `at app::UserController.create(src/users.rs:42)`.
impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}.{}", self.declaring_type, self.method)?;
        match (self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({file}:{line})"),
            (Some(file), None) => write!(f, "({file})"),
            _ => Ok(()),
        }
    }
}

/// Build a [`CallSite`] for the current source position.
///
/// ```rust,ignore
/// call_site!(UserController, "create")  // declaring type from a type
/// call_site!("create")                  // declaring type from the module path
/// ```
#[macro_export]
macro_rules! call_site {
    ($ty:ty, $method:expr) => {
        $crate::CallSite::new(::std::any::type_name::<$ty>(), $method).at(file!(), line!())
    };
    ($method:expr) => {
        $crate::CallSite::new(module_path!(), $method).at(file!(), line!())
    };
}
