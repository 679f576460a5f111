use core::fmt::{self, Write};

use crate::*;

/// One block's line in a heap dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    pub allocated: bool,
    /// Size in bytes.
    pub size: usize,
}

impl From<Descriptor> for BlockInfo {
    fn from(desc: Descriptor) -> Self {
        Self { allocated: desc.allocated, size: desc.size() }
    }
}

/// Formats as `allocated <size>` or `free <size>`, the size in decimal bytes.
impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", if self.allocated { "allocated" } else { "free" }, self.size)
    }
}

impl<B: Brk> Buddy<B> {
    /// Lists every block, from lowest to highest address.
    pub fn describe(&self) -> Result<Vec<BlockInfo>, BuddyError> {
        log::trace!("describe({:#x})", self.start());

        let memory = self.brk.memory();
        let layout = self.layout()?;

        Ok(geometry::blocks(memory, layout).map(|block| block.desc.into()).collect())
    }

    /// Writes [`describe`](Buddy::describe)'s blocks to `out`, one per line.
    pub fn write_info<W: Write>(&self, out: &mut W) -> Result<(), BuddyError> {
        for block in self.describe()? {
            writeln!(out, "{}", block)?;
        }

        Ok(())
    }
}
