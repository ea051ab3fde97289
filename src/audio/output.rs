use anyhow::{anyhow, Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::chime::Chime;
use super::engine::{OutputBackend, VoiceHandle};
use super::shaper::ShapedVoice;

/// Default output device through rodio. The stream is opened on first use
/// and must stay on the thread that created it.
pub struct RodioBackend {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    sample_rate: u32,
}

impl RodioBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stream: None,
            sample_rate,
        }
    }

    fn handle(&self) -> Result<&OutputStreamHandle> {
        self.stream
            .as_ref()
            .map(|(_, handle)| handle)
            .ok_or_else(|| anyhow!("audio output stream not open"))
    }
}

impl OutputBackend for RodioBackend {
    type Voice = RodioVoice;

    fn resume(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let pair = OutputStream::try_default()
                .context("Failed to create audio output stream")?;
            self.stream = Some(pair);
        }
        Ok(())
    }

    fn suspend(&mut self) {
        self.stream = None;
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play_looped(&mut self, voice: ShapedVoice, gain: f32) -> Result<Self::Voice> {
        let sink = Sink::try_new(self.handle()?).context("Failed to create audio sink")?;
        sink.set_volume(gain);
        sink.append(voice);
        sink.play();
        Ok(RodioVoice { sink })
    }

    fn play_once(&mut self, chime: Chime) -> Result<()> {
        let sink = Sink::try_new(self.handle()?).context("Failed to create chime sink")?;
        sink.append(chime);
        // Detached sinks keep playing until the source runs out
        sink.detach();
        Ok(())
    }
}

pub struct RodioVoice {
    sink: Sink,
}

impl VoiceHandle for RodioVoice {
    fn set_gain(&mut self, gain: f32) {
        self.sink.set_volume(gain);
    }

    fn stop(self) {
        self.sink.stop();
    }
}
