//! Events crossing the interpreter boundary.
//!
//! `OutputEvent` is what a presentation adapter subscribes to; the
//! adapter never calls back into the interpreter except by delivering
//! an `InputEvent`.

#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    ShowDialogue {
        speaker: Option<String>,
        text: String,
    },
    ShowChoice {
        prompt: Option<String>,
        options: Vec<String>,
    },
    ShowTextPrompt {
        prompt: Option<String>,
    },

    PlayAudio {
        channel: String,
        url: String,
        volume: f32,
        fade_sec: f32,
        looping: bool,
    },
    StopAudio {
        channel: String,
        fade_sec: f32,
    },
    SetVolume {
        channel: String,
        value: f32,
    },

    SetBackground {
        url: Option<String>,
        is_video: bool,
        looping: bool,
        transition: String,
    },
    StageChanged,
    PlayMovie {
        url: String,
        skippable: bool,
    },
    StopMovie,

    OverlayChanged,
    ScreenEffect {
        kind: &'static str,
    },

    /// Hints the adapter to start fetching assets the cursor is about
    /// to need.
    Preload {
        images: Vec<String>,
        audios: Vec<String>,
    },

    ReturnToTitle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Dialogue click / manual advance; also settles a skippable wait
    /// or movie.
    Advance,
    ChoiceMade { index: usize },
    TextSubmitted { value: String },
    /// A button overlay was activated.
    OverlayAction { overlay_id: String },
    SaveRequest { slot: u32 },
    LoadRequest { slot: u32 },
    Exit,
}
