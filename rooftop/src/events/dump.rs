//! Vendor event-descriptor dump parsing.
//!
//! The dump is the line-oriented output of libpfm4's `showevtinfo`:
//!
//! ```text
//! #-----------------------------
//! IDX      : 37748736
//! Name     : UNHALTED_CORE_CYCLES
//! Umask-00 : 0x00 : PMU : [ANY] : Number of core cycles
//! Umask-01 : 0x01 : PMU : [REF] : Reference cycles
//! #-----------------------------
//! ```
//!
//! Only three markers matter: `Name :` opens an event block, `Umask... :`
//! adds a sub-mask entry, and a `#-` line closes the block. The grammar is
//! pinned to this one dump format; there is no format-version field to
//! check, so anything unrecognized is ignored rather than rejected.

/// One named sub-mask of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmaskEntry {
    pub name: String,
    pub description: String,
}

/// One event block of the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub name: String,
    pub umasks: Vec<UmaskEntry>,
}

/// Parsed descriptor dump, queryable by exact event name.
#[derive(Debug, Clone, Default)]
pub struct EventDump {
    blocks: Vec<EventBlock>,
}

impl EventDump {
    /// Parse a dump. Never fails: unrecognized lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current: Option<EventBlock> = None;

        for line in text.lines() {
            if line.starts_with("#-") {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 3 && tokens[0] == "Name" && tokens[1] == ":" {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                current = Some(EventBlock { name: tokens[2].to_string(), umasks: Vec::new() });
                continue;
            }
            if tokens.len() >= 3 && tokens[0].starts_with("Umask") && tokens[1] == ":" {
                if let Some(ref mut block) = current {
                    let description =
                        if tokens.len() > 4 { tokens[4..].join(" ") } else { String::new() };
                    block.umasks.push(UmaskEntry { name: tokens[2].to_string(), description });
                }
            }
        }
        if let Some(block) = current {
            blocks.push(block);
        }
        Self { blocks }
    }

    /// Locate an event block by exact name match.
    #[must_use]
    pub fn find(&self, event: &str) -> Option<&EventBlock> {
        self.blocks.iter().find(|block| block.name == event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
