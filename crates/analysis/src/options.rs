//! Capability flags advertised by each analysis module.

use std::fmt;

bitflags::bitflags! {
    /// Bitmask telling the orchestrator which entry points a module uses and
    /// which inputs it needs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ModuleOptions: u32 {
        /// The module needs the `E` and `D` matrices.
        const NEED_ED = 1;
        /// `init_x` reads the ensemble `A`.
        const USE_A = 1 << 1;
        /// The module updates `A` itself through `update_a` instead of returning `X`.
        const UPDATE_A = 1 << 2;
        /// The module has an `init_update` / `complete_update` bracket.
        const INIT_UPDATE = 1 << 3;
    }
}

impl ModuleOptions {
    /// No flags.
    pub const NONE: Self = Self::empty();
}

impl fmt::Display for ModuleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let set: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", set.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_and_contains() {
        let opts = ModuleOptions::NEED_ED | ModuleOptions::USE_A;
        assert!(opts.contains(ModuleOptions::NEED_ED));
        assert!(opts.contains(ModuleOptions::USE_A));
        assert!(!opts.contains(ModuleOptions::UPDATE_A));
        assert!(opts.contains(ModuleOptions::NONE));
        assert_eq!(opts.bits(), 0b11);
    }

    #[test]
    fn display_lists_flags() {
        let mut opts = ModuleOptions::NEED_ED;
        opts |= ModuleOptions::INIT_UPDATE;
        assert_eq!(opts.to_string(), "NEED_ED | INIT_UPDATE");
        assert_eq!(ModuleOptions::NONE.to_string(), "NONE");
    }

    #[test]
    fn unknown_bits_dropped() {
        let opts = ModuleOptions::from_bits_truncate(0b1_0101);
        assert_eq!(opts, ModuleOptions::NEED_ED | ModuleOptions::UPDATE_A);
        assert!(ModuleOptions::from_bits(1 << 4).is_none());
        assert_eq!(ModuleOptions::all().bits(), 0b1111);
    }
}
