//! The natural-language constraint records of one project.

use resqplan_store::ConstraintRecord;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("constraint text cannot be empty")]
    Empty,

    #[error("constraint not found: {0:?}")]
    NotFound(String),

    #[error("constraint already exists: {0:?}")]
    Duplicate(String),
}

/// What [`ConstraintSet::insert_if_absent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An active record with the same text already existed.
    AlreadyPresent,
    /// A switched-off record with the same text was switched back on.
    Reactivated,
}

impl InsertOutcome {
    /// Whether the active set changed.
    pub fn changed(self) -> bool {
        !matches!(self, Self::AlreadyPresent)
    }
}

/// Ordered constraint records with unique text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    records: Vec<ConstraintRecord>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records as stored. Later duplicates of an earlier text are
    /// discarded.
    pub fn from_records(records: impl IntoIterator<Item = ConstraintRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            if set.position(&record.text).is_none() {
                set.records.push(record);
            }
        }
        set
    }

    pub fn records(&self) -> &[ConstraintRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ConstraintRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<&ConstraintRecord> {
        self.position(text).map(|i| &self.records[i])
    }

    /// Insert `text` unless an identical record exists.
    pub fn insert_if_absent(&mut self, text: &str) -> Result<InsertOutcome, ConstraintError> {
        let text = normalized(text)?;
        match self.position(text) {
            Some(i) if self.records[i].active => Ok(InsertOutcome::AlreadyPresent),
            Some(i) => {
                self.records[i].active = true;
                Ok(InsertOutcome::Reactivated)
            }
            None => {
                self.records.push(ConstraintRecord::new(text));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    /// Replace the text of `old` in place, keeping its position and state.
    pub fn edit(&mut self, old: &str, new: &str) -> Result<(), ConstraintError> {
        let new = normalized(new)?;
        let index = self
            .position(old)
            .ok_or_else(|| ConstraintError::NotFound(old.to_string()))?;
        if self.records[index].text != new && self.position(new).is_some() {
            return Err(ConstraintError::Duplicate(new.to_string()));
        }
        self.records[index].text = new.to_string();
        Ok(())
    }

    /// Flip the active flag and return the new value.
    pub fn toggle(&mut self, text: &str) -> Result<bool, ConstraintError> {
        let index = self
            .position(text)
            .ok_or_else(|| ConstraintError::NotFound(text.to_string()))?;
        let record = &mut self.records[index];
        record.active = !record.active;
        Ok(record.active)
    }

    pub fn delete(&mut self, text: &str) -> Result<ConstraintRecord, ConstraintError> {
        let index = self
            .position(text)
            .ok_or_else(|| ConstraintError::NotFound(text.to_string()))?;
        Ok(self.records.remove(index))
    }

    /// Texts of active records, in insertion order.
    pub fn active_texts(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.active)
            .map(|r| r.text.clone())
            .collect()
    }

    fn position(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.records.iter().position(|r| r.text == text)
    }
}

fn normalized(text: &str) -> Result<&str, ConstraintError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ConstraintError::Empty)
    } else {
        Ok(text)
    }
}

/// Split pasted text into constraints: blocks separated by blank lines,
/// trimmed, empty blocks dropped.
pub fn split_constraint_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_block(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush_block(&mut current, &mut blocks);
    blocks
}

fn flush_block(current: &mut Vec<&str>, blocks: &mut Vec<String>) {
    let block = current.join("\n");
    let block = block.trim();
    if !block.is_empty() {
        blocks.push(block.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = ConstraintSet::new();
        assert_eq!(set.insert_if_absent("no nights").unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            set.insert_if_absent("  no nights ").unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insert_reactivates_inactive_duplicate() {
        let mut set = ConstraintSet::new();
        set.insert_if_absent("a").unwrap();
        assert!(!set.toggle("a").unwrap());
        assert_eq!(set.insert_if_absent("a").unwrap(), InsertOutcome::Reactivated);
        assert_eq!(set.len(), 1);
        assert_eq!(set.active_texts(), vec!["a"]);
    }

    #[test]
    fn empty_text_is_rejected() {
        let mut set = ConstraintSet::new();
        assert_eq!(set.insert_if_absent("  \n"), Err(ConstraintError::Empty));
        set.insert_if_absent("a").unwrap();
        assert_eq!(set.edit("a", ""), Err(ConstraintError::Empty));
    }

    #[test]
    fn edit_keeps_position_and_state() {
        let mut set = ConstraintSet::new();
        set.insert_if_absent("a").unwrap();
        set.insert_if_absent("b").unwrap();
        set.toggle("a").unwrap();

        set.edit("a", "a2").unwrap();
        assert_eq!(set.records()[0], ConstraintRecord { text: "a2".into(), active: false });
        assert_eq!(set.edit("a2", "b"), Err(ConstraintError::Duplicate("b".into())));
        assert_eq!(set.edit("zzz", "c"), Err(ConstraintError::NotFound("zzz".into())));
        // Editing to the same text is a no-op, not a duplicate.
        set.edit("b", "b").unwrap();
    }

    #[test]
    fn toggle_and_active_texts() {
        let mut set = ConstraintSet::from_records([
            ConstraintRecord::new("a"),
            ConstraintRecord::new("b"),
            ConstraintRecord::new("c"),
        ]);
        set.toggle("b").unwrap();
        assert_eq!(set.active_texts(), vec!["a", "c"]);
        assert!(set.toggle("b").unwrap());
        assert_eq!(set.active_texts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_removes_record() {
        let mut set = ConstraintSet::from_records([ConstraintRecord::new("a")]);
        assert_eq!(set.delete("a").unwrap().text, "a");
        assert!(set.is_empty());
        assert!(matches!(set.delete("a"), Err(ConstraintError::NotFound(_))));
    }

    #[test]
    fn from_records_drops_later_duplicates() {
        let set = ConstraintSet::from_records([
            ConstraintRecord::new("a"),
            ConstraintRecord {
                text: "a".into(),
                active: false,
            },
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.get("a").unwrap().active);
    }

    #[test]
    fn split_on_blank_lines() {
        let pasted = "Ana cannot work nights\n\n  \nLuis works at most\nfour days a week\n\n\n";
        assert_eq!(
            split_constraint_blocks(pasted),
            vec!["Ana cannot work nights", "Luis works at most\nfour days a week"]
        );
        assert!(split_constraint_blocks(" \n\n").is_empty());
    }
}
