use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use super::{io, AppCommand};
use crate::api::{DownloadOptions, Gem};
use crate::core::app::view::{HistoryChoice, PickerEntry, PickerState};
use crate::core::app::{App, KeyBinding, KeyContext, ViewState};
use crate::core::error::ChatError;
use crate::core::history::ConversationSummary;

/// Keys for the filterable gem and history pickers.
pub(super) fn handle_list_key(app: &mut App, key: &KeyEvent) -> Vec<AppCommand> {
    let filter_empty = match &app.view {
        ViewState::PickGem(picker) => picker.filter.is_empty(),
        ViewState::PickHistory(picker) => picker.filter.is_empty(),
        _ => return Vec::new(),
    };
    let binding = app
        .keymap
        .resolve(KeyContext::Picker, key)
        .or_else(|| {
            filter_empty
                .then(|| app.keymap.resolve(KeyContext::PickerNav, key))
                .flatten()
        });

    match binding {
        Some(KeyBinding::Quit) => {
            app.request_exit();
            Vec::new()
        }
        Some(KeyBinding::Cancel) => {
            app.view = ViewState::Chat;
            Vec::new()
        }
        Some(KeyBinding::Submit) => commit_list(app),
        Some(binding) => {
            match &mut app.view {
                ViewState::PickGem(picker) => navigate(picker, binding),
                ViewState::PickHistory(picker) => navigate(picker, binding),
                _ => {}
            }
            Vec::new()
        }
        None => {
            if let Some(c) = filter_char(key) {
                match &mut app.view {
                    ViewState::PickGem(picker) => picker.push_filter(c),
                    ViewState::PickHistory(picker) => picker.push_filter(c),
                    _ => {}
                }
            }
            Vec::new()
        }
    }
}

fn filter_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c)
        }
        _ => None,
    }
}

fn navigate<T: PickerEntry>(picker: &mut PickerState<T>, binding: KeyBinding) {
    match binding {
        KeyBinding::Up => picker.move_up(),
        KeyBinding::Down => picker.move_down(),
        KeyBinding::Home => picker.move_home(),
        KeyBinding::End => picker.move_end(),
        KeyBinding::Backspace => picker.pop_filter(),
        _ => {}
    }
}

fn commit_list(app: &mut App) -> Vec<AppCommand> {
    match std::mem::take(&mut app.view) {
        ViewState::PickGem(picker) => {
            match picker.selected().cloned() {
                Some(gem) => select_gem(app, gem),
                None => app.view = ViewState::PickGem(picker),
            }
            Vec::new()
        }
        ViewState::PickHistory(picker) => match picker.selected().cloned() {
            Some(HistoryChoice::New) => {
                io::start_new_conversation(app);
                Vec::new()
            }
            Some(HistoryChoice::Existing(summary)) => match app.full_history() {
                Some(store) => {
                    app.ui.set_notice(format!("Loading \"{}\"...", summary.display_title()));
                    io::load_conversation(app, store, summary.id)
                }
                None => Vec::new(),
            },
            None => {
                app.view = ViewState::PickHistory(picker);
                Vec::new()
            }
        },
        other => {
            app.view = other;
            Vec::new()
        }
    }
}

fn select_gem(app: &mut App, gem: Gem) {
    info!(gem = %gem.id, "Gem selected");
    app.session.chat.set_gem(Some(gem.id.clone()));
    app.ui.set_notice(format!("Using gem: {}", gem.name));
    app.session.active_gem = Some(gem.name);
}

pub(super) fn handle_image_key(app: &mut App, key: &KeyEvent) -> Vec<AppCommand> {
    let binding = app.keymap.resolve(KeyContext::ImagePicker, key);
    let ViewState::PickImage(picker) = &mut app.view else {
        return Vec::new();
    };

    match binding {
        Some(KeyBinding::Cancel) => app.view = ViewState::Chat,
        Some(KeyBinding::Up) => picker.move_up(),
        Some(KeyBinding::Down) => picker.move_down(),
        Some(KeyBinding::Toggle) => picker.toggle(),
        Some(KeyBinding::SelectAll) => picker.select_all(),
        Some(KeyBinding::SelectNone) => picker.select_none(),
        Some(KeyBinding::Submit) => {
            let indices = picker.chosen();
            let ViewState::PickImage(picker) = std::mem::take(&mut app.view) else {
                return Vec::new();
            };
            if indices.is_empty() {
                return Vec::new();
            }
            app.ui.set_notice(format!("Downloading {} image(s)...", indices.len()));
            return vec![AppCommand::DownloadImages {
                output: picker.output,
                indices,
                options: DownloadOptions {
                    directory: picker.directory,
                    full_size: true,
                },
            }];
        }
        _ => {}
    }
    Vec::new()
}

pub(super) fn handle_gems_loaded(app: &mut App, result: Result<Vec<Gem>, ChatError>) {
    let ViewState::PickGem(picker) = &mut app.view else {
        debug!("Gem list arrived after the picker closed");
        return;
    };
    match result {
        Ok(gems) => {
            debug!(count = gems.len(), "Gems loaded");
            picker.set_items(gems);
        }
        Err(error) => {
            app.view = ViewState::Chat;
            app.ui.set_error(error);
        }
    }
}

pub(super) fn handle_history_loaded(
    app: &mut App,
    result: Result<Vec<ConversationSummary>, ChatError>,
) {
    let ViewState::PickHistory(picker) = &mut app.view else {
        debug!("History list arrived after the picker closed");
        return;
    };
    match result {
        Ok(summaries) => {
            let items = std::iter::once(HistoryChoice::New)
                .chain(summaries.into_iter().map(HistoryChoice::Existing))
                .collect();
            picker.set_items(items);
        }
        Err(error) => {
            app.view = ViewState::Chat;
            app.ui.set_error(error);
        }
    }
}
