//! Visibility policy bits for backends and authentication mechanisms.
//!
//! Every backend and auth mechanism carries a pair of bitsets: the current
//! `visibility` and an `allowed_visibility` ceiling. The invariant
//! `visibility ⊆ allowed_visibility` is maintained by construction: every
//! mutation intersects against the ceiling.

bitflags::bitflags! {
    /// Who may see and select a backend or auth mechanism.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Visibility: u32 {
        /// Visible to end users configuring their own mounts.
        const PERSONAL = 1;
        /// Visible to administrators.
        const ADMIN = 2;
        /// Default for new registrations: personal and admin.
        const DEFAULT = Self::PERSONAL.bits() | Self::ADMIN.bits();
    }
}

/// Current visibility plus its allowed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilitySet {
    visible: Visibility,
    allowed: Visibility,
}

impl Default for VisibilitySet {
    fn default() -> Self {
        Self {
            visible: Visibility::DEFAULT,
            allowed: Visibility::DEFAULT,
        }
    }
}

impl VisibilitySet {
    /// The current visibility.
    pub fn visible(&self) -> Visibility {
        self.visible
    }

    /// The allowed-visibility ceiling.
    pub fn allowed(&self) -> Visibility {
        self.allowed
    }

    /// Bit containment test against the current visibility.
    pub fn is_visible_for(&self, flag: Visibility) -> bool {
        self.visible.contains(flag)
    }

    /// Bit containment test against the allowed ceiling.
    pub fn is_allowed_visible_for(&self, flag: Visibility) -> bool {
        self.allowed.contains(flag)
    }

    /// Replace the visibility, capped by the allowed ceiling.
    pub fn set_visible(&mut self, visibility: Visibility) {
        self.visible = visibility & self.allowed;
    }

    /// Add visibility bits, capped by the allowed ceiling.
    pub fn add_visible(&mut self, visibility: Visibility) {
        self.set_visible(self.visible | visibility);
    }

    /// Remove visibility bits.
    pub fn remove_visible(&mut self, visibility: Visibility) {
        self.set_visible(self.visible - visibility);
    }

    /// Replace the allowed ceiling; the current visibility is intersected
    /// down so the containment invariant holds.
    pub fn set_allowed(&mut self, allowed: Visibility) {
        self.allowed = allowed;
        self.visible &= allowed;
    }
}
