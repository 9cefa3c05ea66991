//! Scope Stack - lexical frames of the functions being lowered
//!
//! One frame per in-progress function (the implicit entry function
//! included). A frame maps variable names to the type of their stack slot
//! and records the pending return value. Resolution is a single flat lookup
//! in the current frame: no shadowing, no outer-frame fallback.

use crate::instruction::Value;
use crate::types::IrType;
use std::collections::HashMap;

/// One lexical frame of an active function
#[derive(Debug)]
pub struct Frame {
    /// Index of the function being built, in the module's function list
    pub func: usize,
    /// Variable name -> slot type
    pub locals: HashMap<String, IrType>,
    /// Value recorded by the most recent return statement
    pub return_value: Option<Value>,
}

impl Frame {
    pub fn new(func: usize) -> Self {
        Self {
            func,
            locals: HashMap::new(),
            return_value: None,
        }
    }
}

/// Stack of frames, one per function currently under construction.
///
/// Accessors on an empty stack panic: that is a programming-level invariant
/// violation inside the generator, never a user-facing error.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a frame for the given function and makes it current
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Discards the current frame
    pub fn pop(&mut self) -> Frame {
        self.frames.pop().expect("scope stack is empty")
    }

    /// The current frame
    pub fn current(&self) -> &Frame {
        self.frames.last().expect("scope stack is empty")
    }

    /// The current mutable frame
    pub fn current_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("scope stack is empty")
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop_are_balanced() {
        let mut scopes = ScopeStack::new();
        scopes.push(Frame::new(0));
        scopes.push(Frame::new(1));
        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.current().func, 1);

        let frame = scopes.pop();
        assert_eq!(frame.func, 1);
        assert_eq!(scopes.current().func, 0);

        scopes.pop();
        assert_eq!(scopes.depth(), 0);
        assert!(scopes.is_empty());
    }

    #[test]
    fn test_lookup_stays_in_current_frame() {
        let mut scopes = ScopeStack::new();
        scopes.push(Frame::new(0));
        scopes.current_mut().locals.insert("x".to_string(), IrType::I64);

        scopes.push(Frame::new(1));
        assert!(scopes.current().locals.get("x").is_none());
    }

    #[test]
    #[should_panic(expected = "scope stack is empty")]
    fn test_current_on_empty_stack_panics() {
        let scopes = ScopeStack::new();
        let _ = scopes.current();
    }
}
