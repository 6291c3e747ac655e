use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    FocusNext,
    FocusPrevious,
    RefreshFocused,
    RefreshAll,
    ClearFocus,
    Resize { width: u16, height: u16 },
    Quit,
}

pub const DASHBOARD_BINDINGS: [HotkeyBinding; 6] = [
    HotkeyBinding {
        key: "tab/j",
        action: "next pane",
    },
    HotkeyBinding {
        key: "shift-tab/k",
        action: "previous pane",
    },
    HotkeyBinding {
        key: "r",
        action: "refresh pane",
    },
    HotkeyBinding {
        key: "R",
        action: "refresh all",
    },
    HotkeyBinding {
        key: "esc",
        action: "clear focus",
    },
    HotkeyBinding {
        key: "q",
        action: "quit",
    },
];

pub fn controls_legend() -> String {
    let parts = DASHBOARD_BINDINGS
        .iter()
        .map(|binding| format!("{} {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("Keys: {}", parts.join("  "))
}

pub fn action_for_key(key: &KeyEvent) -> Option<BoardAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(BoardAction::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('j') | KeyCode::Char('l') => {
            Some(BoardAction::FocusNext)
        }
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('k') | KeyCode::Char('h') => {
            Some(BoardAction::FocusPrevious)
        }
        KeyCode::Enter | KeyCode::Char('r') => Some(BoardAction::RefreshFocused),
        KeyCode::Char('R') | KeyCode::Char('a') => Some(BoardAction::RefreshAll),
        KeyCode::Esc => Some(BoardAction::ClearFocus),
        KeyCode::Char('q') => Some(BoardAction::Quit),
        _ => None,
    }
}

/// Mouse presses quit; motion and scroll are ignored.
pub fn action_for_event(event: &Event) -> Option<BoardAction> {
    match event {
        Event::Key(key) => action_for_key(key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(_) => Some(BoardAction::Quit),
            _ => None,
        },
        Event::Resize(width, height) => Some(BoardAction::Resize {
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{action_for_event, action_for_key, controls_legend, BoardAction, DASHBOARD_BINDINGS};
    use crossterm::event::{
        Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    };

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn navigation_and_refresh_keys_resolve() {
        let cases = [
            (KeyCode::Tab, BoardAction::FocusNext),
            (KeyCode::Char('j'), BoardAction::FocusNext),
            (KeyCode::BackTab, BoardAction::FocusPrevious),
            (KeyCode::Char('k'), BoardAction::FocusPrevious),
            (KeyCode::Char('r'), BoardAction::RefreshFocused),
            (KeyCode::Char('R'), BoardAction::RefreshAll),
            (KeyCode::Esc, BoardAction::ClearFocus),
            (KeyCode::Char('q'), BoardAction::Quit),
        ];
        for (code, expected) in cases {
            assert_eq!(action_for_key(&press(code)), Some(expected), "{code:?}");
        }
        assert_eq!(action_for_key(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_quits_and_releases_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for_key(&ctrl_c), Some(BoardAction::Quit));
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(action_for_key(&ctrl_r), None);

        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(action_for_key(&release), None);
    }

    #[test]
    fn mouse_press_quits_and_resize_carries_dimensions() {
        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(action_for_event(&click), Some(BoardAction::Quit));

        let moved = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(action_for_event(&moved), None);

        assert_eq!(
            action_for_event(&Event::Resize(120, 40)),
            Some(BoardAction::Resize {
                width: 120,
                height: 40
            })
        );
        assert_eq!(action_for_event(&Event::FocusGained), None);
    }

    #[test]
    fn legend_lists_every_binding() {
        let legend = controls_legend();
        for binding in &DASHBOARD_BINDINGS {
            assert!(legend.contains(binding.action), "{legend}");
        }
    }
}
