//! Line-oriented presentation adapter. Good enough to play a story and
//! exercise every suspension point; a real renderer subscribes to the
//! same events.

use std::io::{Write, stdin, stdout};

use fabula_core::driver::Presenter;
use fabula_core::event::{InputEvent, OutputEvent};
use fabula_core::runtime::Ctx;

pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn present(&mut self, out: &OutputEvent, _ctx: &Ctx) -> Option<InputEvent> {
        match out {
            OutputEvent::ShowDialogue { speaker, text } => {
                match speaker {
                    Some(name) => println!("{}: {}", name, text),
                    None => println!("{}", text),
                }
                self.wait_continue()
            }
            OutputEvent::ShowChoice { prompt, options } => {
                if let Some(p) = prompt {
                    println!("--- {} ---", p);
                }
                for (i, o) in options.iter().enumerate() {
                    println!("  [{}] {}", i + 1, o);
                }
                self.wait_choice(options.len())
            }
            OutputEvent::ShowTextPrompt { prompt } => {
                if let Some(p) = prompt {
                    println!("{}", p);
                }
                self.wait_text()
            }
            OutputEvent::PlayMovie { url, skippable } => {
                println!("[movie] {} (skippable: {})", url, skippable);
                self.wait_continue()
            }
            OutputEvent::PlayAudio {
                channel,
                url,
                looping,
                ..
            } => {
                println!("[audio] {} <- {} (loop: {})", channel, url, looping);
                None
            }
            OutputEvent::StopAudio { channel, fade_sec } => {
                println!("[audio] {} stop (fade {:.1}s)", channel, fade_sec);
                None
            }
            OutputEvent::SetBackground { url, .. } => {
                println!("[scene] background: {}", url.as_deref().unwrap_or("(none)"));
                None
            }
            OutputEvent::ReturnToTitle => {
                println!("*** The End ***");
                None
            }
            // Volume samples, stage nudges and preload hints are noise
            // on a terminal.
            _ => None,
        }
    }
}

impl TerminalPresenter {
    /// Re-prompt when the session is waiting but nothing new printed.
    pub fn idle_prompt(&mut self) -> Option<InputEvent> {
        self.wait_continue()
    }

    fn wait_continue(&mut self) -> Option<InputEvent> {
        loop {
            print!("> ");
            stdout().flush().ok()?;
            let mut buf = String::new();
            stdin().read_line(&mut buf).ok()?;
            let trimmed = buf.trim_end();
            if trimmed.is_empty() {
                return Some(InputEvent::Advance);
            }
            if trimmed.eq_ignore_ascii_case("exit") {
                return Some(InputEvent::Exit);
            }
            if let Some(rest) = trimmed.strip_prefix(":save") {
                if let Ok(slot) = rest.trim().parse::<u32>() {
                    return Some(InputEvent::SaveRequest { slot });
                }
            }
            if let Some(rest) = trimmed.strip_prefix(":load") {
                if let Ok(slot) = rest.trim().parse::<u32>() {
                    return Some(InputEvent::LoadRequest { slot });
                }
            }
            println!("invalid");
        }
    }

    fn wait_choice(&mut self, len: usize) -> Option<InputEvent> {
        loop {
            print!("Select> ");
            stdout().flush().ok()?;
            let mut buf = String::new();
            stdin().read_line(&mut buf).ok()?;
            if let Ok(n) = buf.trim().parse::<usize>() {
                if n >= 1 && n <= len {
                    return Some(InputEvent::ChoiceMade { index: n - 1 });
                }
            }
            println!("invalid");
        }
    }

    fn wait_text(&mut self) -> Option<InputEvent> {
        print!("Input> ");
        stdout().flush().ok()?;
        let mut buf = String::new();
        stdin().read_line(&mut buf).ok()?;
        Some(InputEvent::TextSubmitted {
            value: buf.trim_end().to_string(),
        })
    }
}
