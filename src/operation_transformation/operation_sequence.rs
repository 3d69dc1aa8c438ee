use super::text_operation::TextOperation;

/// Builder producing normalised lists of `TextOperation`s.
///
/// Empty steps are dropped, adjacent steps of the same kind are merged and an
/// insert directly followed by a delete is kept in insert-then-delete order,
/// so two equivalent edits always build to the same list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSequence {
    operations: Vec<TextOperation>,
}

impl OperationSequence {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
        }
    }

    pub fn retain(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            return self;
        }

        match self.operations.last_mut() {
            Some(TextOperation::Retain(last)) if last.checked_add(count).is_some() => {
                *last += count;
            }
            _ => self.operations.push(TextOperation::Retain(count)),
        }

        self
    }

    pub fn insert(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }

        if let Some(TextOperation::Insert(last)) = self.operations.last_mut() {
            last.push_str(text);
            return self;
        }

        if matches!(self.operations.last(), Some(TextOperation::Delete(_))) {
            let delete_index = self.operations.len() - 1;

            if let Some(TextOperation::Insert(previous)) = delete_index
                .checked_sub(1)
                .and_then(|index| self.operations.get_mut(index))
            {
                previous.push_str(text);
            } else {
                self.operations
                    .insert(delete_index, TextOperation::Insert(text.to_owned()));
            }

            return self;
        }

        self.operations.push(TextOperation::Insert(text.to_owned()));
        self
    }

    pub fn delete(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            return self;
        }

        match self.operations.last_mut() {
            Some(TextOperation::Delete(last)) if last.checked_add(count).is_some() => {
                *last += count;
            }
            _ => self.operations.push(TextOperation::Delete(count)),
        }

        self
    }

    pub fn push(&mut self, operation: TextOperation) -> &mut Self {
        match operation {
            TextOperation::Retain(count) => self.retain(count),
            TextOperation::Insert(text) => self.insert(&text),
            TextOperation::Delete(count) => self.delete(count),
        }
    }

    #[must_use]
    pub fn operations(&self) -> &[TextOperation] { &self.operations }

    #[must_use]
    pub fn into_operations(self) -> Vec<TextOperation> { self.operations }
}

impl FromIterator<TextOperation> for OperationSequence {
    fn from_iter<I: IntoIterator<Item = TextOperation>>(iter: I) -> Self {
        let mut sequence = OperationSequence::new();
        for operation in iter {
            sequence.push(operation);
        }
        sequence
    }
}

/// Normalises an arbitrary list, see `OperationSequence`.
#[must_use]
pub fn normalize(operations: Vec<TextOperation>) -> Vec<TextOperation> {
    operations
        .into_iter()
        .collect::<OperationSequence>()
        .into_operations()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_merges_adjacent_steps() {
        let mut sequence = OperationSequence::new();
        sequence
            .retain(2)
            .retain(3)
            .insert("ab")
            .insert("c")
            .delete(1)
            .delete(4);

        assert_eq!(
            sequence.into_operations(),
            vec![
                TextOperation::Retain(5),
                TextOperation::Insert("abc".to_owned()),
                TextOperation::Delete(5),
            ]
        );
    }

    #[test]
    fn test_insert_goes_before_delete() {
        let mut sequence = OperationSequence::new();
        sequence.retain(1).delete(2).insert("x").insert("y");

        assert_eq!(
            sequence.into_operations(),
            vec![
                TextOperation::Retain(1),
                TextOperation::Insert("xy".to_owned()),
                TextOperation::Delete(2),
            ]
        );
    }

    #[test]
    fn test_drops_empty_steps() {
        assert_eq!(
            normalize(vec![
                TextOperation::Retain(0),
                TextOperation::Insert(String::new()),
                TextOperation::Delete(0),
            ]),
            vec![]
        );
    }

    #[test]
    fn test_counts_too_large_to_merge_stay_apart() {
        let mut sequence = OperationSequence::new();
        sequence.retain(usize::MAX).retain(1).delete(usize::MAX).delete(2);

        assert_eq!(
            sequence.into_operations(),
            vec![
                TextOperation::Retain(usize::MAX),
                TextOperation::Retain(1),
                TextOperation::Delete(usize::MAX),
                TextOperation::Delete(2),
            ]
        );
    }
}
