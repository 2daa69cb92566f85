use bitflags::bitflags;

bitflags! {
    /// Flags a file is opened with.
    ///
    /// READ, WRITE and APPEND decide what a handle may do for its whole
    /// lifetime; CREATE, TRUNCATE and EXCLUSIVE only affect the open itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ      = 1 << 0;
        const WRITE     = 1 << 1;
        const APPEND    = 1 << 2;
        const CREATE    = 1 << 3;
        const TRUNCATE  = 1 << 4;
        const EXCLUSIVE = 1 << 5;

        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl OpenFlags {
    pub fn readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn writeable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn append_only(self) -> bool {
        self.writeable() && self.contains(Self::APPEND)
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READ
    }
}
