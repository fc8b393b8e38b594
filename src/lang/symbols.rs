use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("'{name}' is already declared in {scope}")]
    Redeclaration { name: String, scope: &'static str },
    #[error("'{name}' is not declared")]
    Undefined { name: String },
}

/// Resolved variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Global(usize),
    Param(usize),
    Local(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub id: usize,
    pub arity: usize,
}

/// Names in insertion order, each mapped to its dense index.
#[derive(Debug, Default, Clone)]
struct NameTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NameTable {
    fn declare(&mut self, name: &str) -> Option<usize> {
        if self.index.contains_key(name) {
            return None;
        }
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), slot);
        Some(slot)
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

#[derive(Debug, Default)]
struct FrameScope {
    params: NameTable,
    locals: NameTable,
}

/// Frame contents of a finished function scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub params: Vec<String>,
    pub locals: Vec<String>,
}

/// Global variables, functions, and the scope of the function being parsed.
///
/// `main` is registered on construction and always has id 0.
#[derive(Debug)]
pub struct SymbolTable {
    globals: NameTable,
    functions: NameTable,
    arities: Vec<usize>,
    frame: Option<FrameScope>,
}

pub const MAIN_FUNCTION: &str = "main";

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut functions = NameTable::default();
        functions.declare(MAIN_FUNCTION);
        SymbolTable {
            globals: NameTable::default(),
            functions,
            arities: vec![0],
            frame: None,
        }
    }

    pub fn declare_function(&mut self, name: &str, arity: usize) -> Result<usize, NameError> {
        let id = self
            .functions
            .declare(name)
            .ok_or_else(|| NameError::Redeclaration {
                name: name.to_string(),
                scope: "function table",
            })?;
        self.arities.push(arity);
        Ok(id)
    }

    pub fn function(&self, name: &str) -> Result<FunctionSig, NameError> {
        let id = self.functions.get(name).ok_or_else(|| NameError::Undefined {
            name: name.to_string(),
        })?;
        Ok(FunctionSig {
            id,
            arity: self.arities[id],
        })
    }

    pub fn function_names(&self) -> &[String] {
        &self.functions.names
    }

    pub fn global_names(&self) -> &[String] {
        &self.globals.names
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    /// Opens a function scope with the given parameters in slots `0..params.len()`.
    pub fn enter_function(&mut self, params: &[String]) -> Result<(), NameError> {
        let mut frame = FrameScope::default();
        for param in params {
            frame
                .params
                .declare(param)
                .ok_or_else(|| NameError::Redeclaration {
                    name: param.clone(),
                    scope: "parameter list",
                })?;
        }
        self.frame = Some(frame);
        Ok(())
    }

    /// Closes the current function scope and returns its layout.
    pub fn leave_function(&mut self) -> FrameLayout {
        let frame = self.frame.take().unwrap_or_default();
        FrameLayout {
            params: frame.params.names,
            locals: frame.locals.names,
        }
    }

    /// Declares a variable in the current scope.
    ///
    /// Inside a function the new local gets the first slot above the
    /// parameters. A local may not reuse a parameter name since both live in
    /// the same frame.
    pub fn declare(&mut self, name: &str) -> Result<VarRef, NameError> {
        match self.frame.as_mut() {
            Some(frame) => {
                if frame.params.get(name).is_some() {
                    return Err(NameError::Redeclaration {
                        name: name.to_string(),
                        scope: "function scope",
                    });
                }
                let index = frame
                    .locals
                    .declare(name)
                    .ok_or_else(|| NameError::Redeclaration {
                        name: name.to_string(),
                        scope: "function scope",
                    })?;
                Ok(VarRef::Local(frame.params.len() + index))
            }
            None => self
                .globals
                .declare(name)
                .map(VarRef::Global)
                .ok_or_else(|| NameError::Redeclaration {
                    name: name.to_string(),
                    scope: "global scope",
                }),
        }
    }

    /// Looks a name up in the current function's locals and params, then in globals.
    pub fn resolve(&self, name: &str) -> Result<VarRef, NameError> {
        if let Some(frame) = &self.frame {
            if let Some(index) = frame.locals.get(name) {
                return Ok(VarRef::Local(frame.params.len() + index));
            }
            if let Some(slot) = frame.params.get(name) {
                return Ok(VarRef::Param(slot));
            }
        }
        self.globals
            .get(name)
            .map(VarRef::Global)
            .ok_or_else(|| NameError::Undefined {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn main_is_function_zero() {
        let mut table = SymbolTable::new();
        assert_eq!(table.function("main").unwrap().id, 0);
        assert_eq!(table.declare_function("f", 2).unwrap(), 1);
        assert_eq!(table.function("f").unwrap(), FunctionSig { id: 1, arity: 2 });
    }

    #[test]
    fn duplicate_function_is_rejected() {
        let mut table = SymbolTable::new();
        table.declare_function("f", 0).unwrap();
        assert!(matches!(
            table.declare_function("f", 1),
            Err(NameError::Redeclaration { .. })
        ));
    }

    #[test]
    fn globals_are_dense_in_declaration_order() {
        let mut table = SymbolTable::new();
        assert_eq!(table.declare("x").unwrap(), VarRef::Global(0));
        assert_eq!(table.declare("y").unwrap(), VarRef::Global(1));
        assert!(table.declare("x").is_err());
    }

    #[test]
    fn locals_sit_above_params() {
        let mut table = SymbolTable::new();
        table.enter_function(&names(&["n", "m"])).unwrap();
        assert_eq!(table.declare("a").unwrap(), VarRef::Local(2));
        assert_eq!(table.declare("b").unwrap(), VarRef::Local(3));
        assert_eq!(table.resolve("m").unwrap(), VarRef::Param(1));
        let layout = table.leave_function();
        assert_eq!(layout.params, names(&["n", "m"]));
        assert_eq!(layout.locals, names(&["a", "b"]));
    }

    #[test]
    fn locals_shadow_globals() {
        let mut table = SymbolTable::new();
        table.declare("x").unwrap();
        table.enter_function(&[]).unwrap();
        assert_eq!(table.resolve("x").unwrap(), VarRef::Global(0));
        table.declare("x").unwrap();
        assert_eq!(table.resolve("x").unwrap(), VarRef::Local(0));
        table.leave_function();
        assert_eq!(table.resolve("x").unwrap(), VarRef::Global(0));
    }

    #[test]
    fn local_cannot_reuse_param_name() {
        let mut table = SymbolTable::new();
        table.enter_function(&names(&["n"])).unwrap();
        assert!(matches!(
            table.declare("n"),
            Err(NameError::Redeclaration { .. })
        ));
    }

    #[test]
    fn duplicate_param_is_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.enter_function(&names(&["a", "a"])).is_err());
    }

    #[test]
    fn undefined_name() {
        let table = SymbolTable::new();
        assert_eq!(
            table.resolve("ghost"),
            Err(NameError::Undefined {
                name: "ghost".to_string()
            })
        );
    }
}
