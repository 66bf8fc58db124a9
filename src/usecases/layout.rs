use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::layout::{derive_layout, LayoutState, View, ViewVisibility};

/// Tracks which presentation surfaces are visible.
#[derive(Debug, Clone, Default)]
pub struct LayoutCoordinator {
    visibility: Arc<Mutex<ViewVisibility>>,
}

impl LayoutCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_menu(&self) {
        self.mutate(|visibility| visibility.show(View::Menu));
    }

    pub fn hide_menu(&self) {
        self.mutate(|visibility| visibility.hide(View::Menu));
    }

    pub fn show_chat(&self) {
        self.mutate(|visibility| visibility.show(View::Chat));
    }

    pub fn layout(&self) -> LayoutState {
        let visibility = self
            .visibility
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        derive_layout(&visibility)
    }

    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut ViewVisibility),
    {
        let mut visibility = self
            .visibility
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        mutator(&mut visibility);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_toggles_independently_of_chat() {
        let layout = LayoutCoordinator::new();

        layout.show_menu();
        layout.show_chat();
        layout.hide_menu();

        assert_eq!(layout.layout(), LayoutState { menu: false, chat: true });
    }

    #[test]
    fn clones_share_visibility() {
        let layout = LayoutCoordinator::new();
        let other = layout.clone();

        other.show_menu();

        assert!(layout.layout().menu);
    }
}
