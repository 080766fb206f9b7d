// state local to tui, so keys can be resolved into semantic inputevents
// without asking the middle layer; synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub editing_prompt: bool, // typed keys go to the prompt box
    pub notice_shown: bool,   // next key only dismisses the notice
}

impl TuiState {
    pub fn sync(&mut self, state: &crate::shared::DisplayState) {
        self.editing_prompt = state.editing_prompt;
        self.notice_shown = state.notice.is_some();
    }
}
