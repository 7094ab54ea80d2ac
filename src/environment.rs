//! Variable frames for the interpreter.
//!
//! Frames live on an owning stack and refer to their parent by index, so a
//! lookup walks parent links without any shared ownership. Frames are pushed
//! on function entry and popped on return, which keeps every live index valid.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, i64>,
    parent: Option<FrameId>,
}

#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Environment {
    /// Creates an environment holding only the global frame.
    pub fn new() -> Environment {
        Environment {
            frames: vec![Frame::default()],
        }
    }

    pub fn global(&self) -> FrameId {
        FrameId(0)
    }

    /// The innermost frame, where new bindings are created.
    pub fn current(&self) -> FrameId {
        FrameId(self.frames.len() - 1)
    }

    /// Number of live frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Pushes an empty frame chained to `parent` and makes it current.
    pub fn push(&mut self, parent: FrameId) -> FrameId {
        debug_assert!(parent.0 < self.frames.len(), "parent frame is not live");
        self.frames.push(Frame {
            bindings: HashMap::new(),
            parent: Some(parent),
        });
        self.current()
    }

    /// Pops the current frame. The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Finds the frame that binds `name`, searching from `from` outwards.
    pub fn lookup(&self, from: FrameId, name: &str) -> Option<FrameId> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let frame = &self.frames[id.0];
            if frame.bindings.contains_key(name) {
                return Some(id);
            }
            cursor = frame.parent;
        }
        None
    }

    pub fn get(&self, from: FrameId, name: &str) -> Option<i64> {
        self.lookup(from, name)
            .and_then(|owner| self.frames[owner.0].bindings.get(name).copied())
    }

    /// Creates or overwrites a binding in `frame` itself, ignoring ancestors.
    pub fn define(&mut self, frame: FrameId, name: &str, value: i64) -> Option<i64> {
        self.frames[frame.0]
            .bindings
            .insert(name.to_string(), value)
    }

    /// Reassigns `name` in the frame that already binds it, or binds it in
    /// `frame` when no frame in the chain does. Returns the previous value.
    pub fn bind_or_assign(&mut self, frame: FrameId, name: &str, value: i64) -> Option<i64> {
        let owner = self.lookup(frame, name).unwrap_or(frame);
        self.define(owner, name, value)
    }
}
