use std::str::Chars;

use crate::errors::OperationError;

/// A helper for building a string in-order based on an original string and a
/// series of insertions, deletions, and copies applied to it. It is safe to use
/// with UTF-8 strings as all operations are based on character indices. The
/// methods must be called in-order.
///
/// Unlike a forgiving builder, every step is bounds-checked: a step running
/// past the end of the original is an error and so is finishing before the
/// whole original has been consumed.
pub struct StringBuilder<'a> {
    original: Chars<'a>,
    position: usize,
    length: usize,
    buffer: String,
}

impl<'a> StringBuilder<'a> {
    pub fn new(original: &'a str) -> StringBuilder<'a> {
        StringBuilder {
            original: original.chars(),
            position: 0,
            length: original.chars().count(),
            buffer: String::with_capacity(original.len()),
        }
    }

    /// Insert a string at the end of the built buffer.
    pub fn insert(&mut self, text: &str) { self.buffer.push_str(text); }

    /// Skip copying `length` characters from the original string to the built
    /// buffer.
    pub fn delete(&mut self, length: usize) -> Result<(), OperationError> {
        self.check_bounds(length)?;

        if length > 0 {
            self.original.nth(length - 1);
        }
        self.position += length;

        Ok(())
    }

    /// Same as `delete` but returns the skipped characters.
    pub fn take_deleted(&mut self, length: usize) -> Result<String, OperationError> {
        self.check_bounds(length)?;

        let deleted = self.original.by_ref().take(length).collect();
        self.position += length;

        Ok(deleted)
    }

    /// Copy `length` characters from the original string to the built buffer.
    pub fn retain(&mut self, length: usize) -> Result<(), OperationError> {
        self.check_bounds(length)?;

        self.buffer.extend(self.original.by_ref().take(length));
        self.position += length;

        Ok(())
    }

    /// Number of characters of the original which haven't been consumed yet.
    pub fn remaining(&self) -> usize { self.length - self.position }

    /// Returns the built string if the whole original has been consumed.
    pub fn build(self) -> Result<String, OperationError> {
        if self.position == self.length {
            Ok(self.buffer)
        } else {
            Err(OperationError::LengthMismatch {
                expected: self.length,
                consumed: self.position,
            })
        }
    }

    fn check_bounds(&self, requested: usize) -> Result<(), OperationError> {
        if requested > self.remaining() {
            return Err(OperationError::OutOfBounds {
                position: self.position,
                requested,
                available: self.remaining(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_string_builder() -> Result<(), OperationError> {
        let original = "aaa bbb ccc";
        let mut builder = StringBuilder::new(original);

        builder.insert("ddd");
        builder.delete(3)?;
        builder.retain(8)?;
        builder.insert(" eee");

        assert_eq!(builder.build()?, "ddd bbb ccc eee");

        let original = "abcde";
        let mut builder = StringBuilder::new(original);

        builder.retain(1)?;
        builder.delete(3)?;
        builder.retain(1)?;

        assert_eq!(builder.build()?, "ae");

        Ok(())
    }

    #[test]
    fn test_empty_original() -> Result<(), OperationError> {
        let mut builder = StringBuilder::new("");

        builder.insert("test");
        assert_eq!(builder.build()?, "test");

        Ok(())
    }

    #[test]
    fn test_unicode_characters() -> Result<(), OperationError> {
        let original = "こんにちは";
        let mut builder = StringBuilder::new(original);

        builder.retain(3)?;
        builder.insert("世界, ");
        builder.retain(2)?;

        assert_eq!(builder.build()?, "こんに世界, ちは");

        Ok(())
    }

    #[test]
    fn test_take_deleted() -> Result<(), OperationError> {
        let mut builder = StringBuilder::new("abcdef");

        builder.retain(2)?;
        assert_eq!(builder.take_deleted(2)?, "cd");
        builder.retain(2)?;

        assert_eq!(builder.build()?, "abef");

        Ok(())
    }

    #[test]
    fn test_overrun_is_an_error() {
        let mut builder = StringBuilder::new("Hello");

        assert_eq!(
            builder.retain(6),
            Err(OperationError::OutOfBounds {
                position: 0,
                requested: 6,
                available: 5
            })
        );
    }

    #[test]
    fn test_unfinished_is_an_error() -> Result<(), OperationError> {
        let mut builder = StringBuilder::new("Hello");
        builder.delete(2)?;

        assert_eq!(
            builder.build(),
            Err(OperationError::LengthMismatch {
                expected: 5,
                consumed: 2
            })
        );

        Ok(())
    }
}
