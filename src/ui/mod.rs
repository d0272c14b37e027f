//! Flag picker side panel.

use crate::assets::catalog::{FlagEntry, FLAG_CATALOG};
use crate::viewer::ViewerState;

/// Selection state for the catalog list. Returns the picked entry for the
/// frame a row is clicked.
#[derive(Debug, Default)]
pub struct FlagPanel {
    selected: Option<usize>,
}

impl FlagPanel {
    pub fn show(&mut self, ctx: &egui::Context, state: ViewerState) -> Option<&'static FlagEntry> {
        let mut picked = None;
        egui::SidePanel::left("flag_panel")
            .default_width(170.0)
            .show(ctx, |ui| {
                ui.heading("Banderas");
                match state {
                    ViewerState::Initializing => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Cargando modelo...");
                        });
                    }
                    ViewerState::Mutating => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Aplicando bandera...");
                        });
                    }
                    _ => {}
                }
                ui.separator();
                for (index, entry) in FLAG_CATALOG.iter().enumerate() {
                    let selected = self.selected == Some(index);
                    if ui.selectable_label(selected, entry.label).clicked() {
                        self.selected = Some(index);
                        picked = Some(entry);
                    }
                }
            });
        picked
    }

    pub fn selected(&self) -> Option<&'static FlagEntry> {
        self.selected.and_then(|index| FLAG_CATALOG.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_starts_with_no_selection() {
        let panel = FlagPanel::default();
        assert!(panel.selected().is_none());
    }
}
