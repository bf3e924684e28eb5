//! Operand stack.
//!
//! A LIFO of `u32` words with explicit capacity doubling. Every access is
//! bounds-checked; reaching below the bottom yields [`StackUnderflow`]
//! instead of reading stale memory.

use imp_derive::Error;

/// Capacity of the first allocation.
pub const INITIAL_CAPACITY: usize = 16;

/// Pop or peek reached below the bottom of the stack.
///
/// `depth` is the requested position below the top (0 = top), `size` the
/// number of elements that were on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stack underflow: depth {depth}, size {size}")]
pub struct StackUnderflow {
    pub depth: usize,
    pub size: usize,
}

/// Growable LIFO of unsigned 32-bit words.
#[derive(Debug, Clone, Default)]
pub struct OperandStack {
    words: Vec<u32>,
}

impl OperandStack {
    /// Creates an empty stack. Nothing is allocated until the first push.
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Pushes `word` on top, doubling the backing storage when it is full.
    pub fn push(&mut self, word: u32) {
        if self.words.len() == self.words.capacity() {
            let additional = self.words.capacity().max(INITIAL_CAPACITY);
            self.words.reserve_exact(additional);
        }
        self.words.push(word);
    }

    /// Removes and returns the top word.
    pub fn pop(&mut self) -> Result<u32, StackUnderflow> {
        self.words.pop().ok_or(StackUnderflow { depth: 0, size: 0 })
    }

    /// Returns the word `depth` positions below the top without removing it.
    pub fn peek(&self, depth: usize) -> Result<u32, StackUnderflow> {
        let size = self.words.len();
        depth
            .checked_add(1)
            .and_then(|n| size.checked_sub(n))
            .and_then(|idx| self.words.get(idx).copied())
            .ok_or(StackUnderflow { depth, size })
    }

    /// Number of words on the stack.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Current backing capacity, always at least [`len`](Self::len).
    pub fn capacity(&self) -> usize {
        self.words.capacity()
    }

    /// Stack contents from bottom to top.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_restores_stack() {
        let mut stack = OperandStack::new();
        stack.push(1);
        stack.push(u32::MAX);
        assert_eq!(stack.pop(), Ok(u32::MAX));
        assert_eq!(stack.as_slice(), &[1]);
    }

    #[test]
    fn pop_empty_underflows() {
        let mut stack = OperandStack::new();
        assert_eq!(stack.pop(), Err(StackUnderflow { depth: 0, size: 0 }));
    }

    #[test]
    fn peek_counts_from_top() {
        let mut stack = OperandStack::new();
        for w in [10, 20, 30] {
            stack.push(w);
        }
        assert_eq!(stack.peek(0), Ok(30));
        assert_eq!(stack.peek(2), Ok(10));
        assert_eq!(stack.peek(3), Err(StackUnderflow { depth: 3, size: 3 }));
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn peek_empty_underflows() {
        let stack = OperandStack::new();
        assert_eq!(stack.peek(0), Err(StackUnderflow { depth: 0, size: 0 }));
    }

    #[test]
    fn growth_keeps_earlier_elements() {
        let mut stack = OperandStack::new();
        let count = INITIAL_CAPACITY as u32 * 5 + 3;
        for w in 0..count {
            stack.push(w);
            assert!(stack.capacity() >= stack.len());
        }
        let expected: Vec<u32> = (0..count).collect();
        assert_eq!(stack.as_slice(), expected.as_slice());
    }

    #[test]
    fn capacity_doubles_and_never_shrinks() {
        let mut stack = OperandStack::new();
        stack.push(0);
        while stack.len() < stack.capacity() {
            stack.push(0);
        }
        let full = stack.capacity();
        assert!(full >= INITIAL_CAPACITY);
        stack.push(0);
        assert!(stack.capacity() >= 2 * full);

        let grown = stack.capacity();
        while stack.pop().is_ok() {}
        assert_eq!(stack.capacity(), grown);
    }

    #[test]
    fn underflow_message() {
        let err = StackUnderflow { depth: 1, size: 0 };
        assert_eq!(err.to_string(), "stack underflow: depth 1, size 0");
    }
}
