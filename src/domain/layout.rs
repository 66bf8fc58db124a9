/// UI surfaces whose visibility the presentation layer toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Menu,
    Chat,
}

/// Visibility record keyed by [`View`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewVisibility {
    menu: bool,
    chat: bool,
}

impl ViewVisibility {
    pub fn show(&mut self, view: View) {
        *self.slot(view) = true;
    }

    pub fn hide(&mut self, view: View) {
        *self.slot(view) = false;
    }

    pub fn is_visible(&self, view: View) -> bool {
        match view {
            View::Menu => self.menu,
            View::Chat => self.chat,
        }
    }

    fn slot(&mut self, view: View) -> &mut bool {
        match view {
            View::Menu => &mut self.menu,
            View::Chat => &mut self.chat,
        }
    }
}

/// Layout flags published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutState {
    pub menu: bool,
    pub chat: bool,
}

pub fn derive_layout(visibility: &ViewVisibility) -> LayoutState {
    LayoutState {
        menu: visibility.is_visible(View::Menu),
        chat: visibility.is_visible(View::Chat),
    }
}
