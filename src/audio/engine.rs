use anyhow::{Context, Result};

use super::chime::Chime;
use super::noise::{self, NoiseFamily};
use super::shaper::{ambient_gain, ShapedVoice};

const ENABLE_LOGS: bool = true;

/// Live control over one playing sound graph.
pub trait VoiceHandle {
    fn set_gain(&mut self, gain: f32);
    fn stop(self);
}

/// The shared audio output context. Implementations create it lazily in
/// `resume` and must tolerate `resume` being called repeatedly.
pub trait OutputBackend {
    type Voice: VoiceHandle;

    fn resume(&mut self) -> Result<()>;
    /// Releases the output context. A later `resume` recreates it.
    fn suspend(&mut self);
    fn sample_rate(&self) -> u32;
    fn play_looped(&mut self, voice: ShapedVoice, gain: f32) -> Result<Self::Voice>;
    fn play_once(&mut self, chime: Chime) -> Result<()>;
}

struct AmbientVoice<V> {
    family: NoiseFamily,
    volume: u8,
    handle: V,
}

/// Owns the output context and the single ambient voice slot.
pub struct AudioEngine<B: OutputBackend> {
    backend: B,
    ambient: Option<AmbientVoice<B::Voice>>,
}

impl<B: OutputBackend> AudioEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ambient: None,
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        self.backend.resume()
    }

    pub fn suspend(&mut self) {
        self.stop_ambient();
        self.backend.suspend();
    }

    /// Replaces whatever ambient voice is playing with a freshly generated
    /// one. The previous voice is stopped before the new buffer is built.
    pub fn start_ambient(&mut self, family: NoiseFamily, volume: u8) -> Result<()> {
        self.stop_ambient();
        self.backend
            .resume()
            .context("audio output unavailable for ambient sound")?;

        let buffer = noise::generate_fresh(family, self.backend.sample_rate());
        let voice = ShapedVoice::for_family(family, buffer);
        let handle = self
            .backend
            .play_looped(voice, ambient_gain(volume))
            .with_context(|| format!("failed to start {family} ambient voice"))?;

        crate::log_info!("Ambient voice started: {} at {}%", family, volume);
        self.ambient = Some(AmbientVoice {
            family,
            volume,
            handle,
        });
        Ok(())
    }

    pub fn stop_ambient(&mut self) {
        if let Some(voice) = self.ambient.take() {
            voice.handle.stop();
            crate::log_info!("Ambient voice stopped: {}", voice.family);
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        if let Some(voice) = self.ambient.as_mut() {
            voice.volume = volume;
            voice.handle.set_gain(ambient_gain(volume));
        }
    }

    pub fn play_chime(&mut self) -> Result<()> {
        self.backend
            .resume()
            .context("audio output unavailable for chime")?;
        let chime = Chime::new(self.backend.sample_rate());
        self.backend.play_once(chime)
    }

    /// Family and volume of the playing ambient voice, if any.
    pub fn active_ambient(&self) -> Option<(NoiseFamily, u8)> {
        self.ambient.as_ref().map(|voice| (voice.family, voice.volume))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub struct Ledger {
        pub resumes: usize,
        pub suspends: usize,
        pub chimes: usize,
        pub started: usize,
        pub live: Vec<usize>,
        pub gains: Vec<(usize, f32)>,
    }

    /// Backend that plays nothing and records every call.
    pub struct RecordingBackend {
        pub ledger: Rc<RefCell<Ledger>>,
        pub available: bool,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self {
                ledger: Rc::new(RefCell::new(Ledger::default())),
                available: true,
            }
        }

        pub fn live_voices(&self) -> usize {
            self.ledger.borrow().live.len()
        }
    }

    pub struct RecordedVoice {
        id: usize,
        ledger: Rc<RefCell<Ledger>>,
    }

    impl VoiceHandle for RecordedVoice {
        fn set_gain(&mut self, gain: f32) {
            self.ledger.borrow_mut().gains.push((self.id, gain));
        }

        fn stop(self) {
            self.ledger.borrow_mut().live.retain(|&id| id != self.id);
        }
    }

    impl OutputBackend for RecordingBackend {
        type Voice = RecordedVoice;

        fn resume(&mut self) -> Result<()> {
            if !self.available {
                bail!("no output device");
            }
            self.ledger.borrow_mut().resumes += 1;
            Ok(())
        }

        fn suspend(&mut self) {
            self.ledger.borrow_mut().suspends += 1;
        }

        fn sample_rate(&self) -> u32 {
            8000
        }

        fn play_looped(&mut self, mut voice: ShapedVoice, gain: f32) -> Result<Self::Voice> {
            assert!(voice.next().is_some(), "ambient voice must produce samples");
            let mut ledger = self.ledger.borrow_mut();
            ledger.started += 1;
            let id = ledger.started;
            ledger.live.push(id);
            ledger.gains.push((id, gain));
            Ok(RecordedVoice {
                id,
                ledger: Rc::clone(&self.ledger),
            })
        }

        fn play_once(&mut self, chime: Chime) -> Result<()> {
            assert!(chime.count() > 0);
            self.ledger.borrow_mut().chimes += 1;
            Ok(())
        }
    }
}
