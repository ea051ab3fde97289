use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use workfocus_lib::audio::chime::{Chime, CHIME_SECONDS};
use workfocus_lib::audio::shaper::{ambient_gain, ShapedVoice};
use workfocus_lib::audio::{
    AudioEngine, AudioEngineHandle, NoiseFamily, OutputBackend, SoundPlayer, VoiceHandle,
};

const RATE: u32 = 8000;

#[derive(Default)]
struct Mixer {
    playing: usize,
    peak: f32,
    gain: f32,
    chime_samples: Vec<usize>,
}

/// Renders a slice of every voice instead of sending it to a device.
struct RenderingBackend {
    mixer: Rc<RefCell<Mixer>>,
}

struct RenderedVoice {
    mixer: Rc<RefCell<Mixer>>,
}

impl VoiceHandle for RenderedVoice {
    fn set_gain(&mut self, gain: f32) {
        self.mixer.borrow_mut().gain = gain;
    }

    fn stop(self) {
        self.mixer.borrow_mut().playing -= 1;
    }
}

impl OutputBackend for RenderingBackend {
    type Voice = RenderedVoice;

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn suspend(&mut self) {}

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn play_looped(&mut self, voice: ShapedVoice, gain: f32) -> Result<RenderedVoice> {
        // Three buffer lengths, so the loop point is crossed
        let peak = voice
            .take(RATE as usize * 6)
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()));
        let mut mixer = self.mixer.borrow_mut();
        mixer.playing += 1;
        mixer.peak = peak;
        mixer.gain = gain;
        Ok(RenderedVoice {
            mixer: Rc::clone(&self.mixer),
        })
    }

    fn play_once(&mut self, chime: Chime) -> Result<()> {
        self.mixer.borrow_mut().chime_samples.push(chime.count());
        Ok(())
    }
}

fn engine() -> (AudioEngine<RenderingBackend>, Rc<RefCell<Mixer>>) {
    let mixer = Rc::new(RefCell::new(Mixer::default()));
    let backend = RenderingBackend {
        mixer: Rc::clone(&mixer),
    };
    (AudioEngine::new(backend), mixer)
}

#[test]
fn test_every_family_renders_audible_bounded_audio() {
    let (mut engine, mixer) = engine();

    for family in NoiseFamily::ALL {
        engine.start_ambient(family, 100).unwrap();
        let peak = mixer.borrow().peak;
        assert!(peak > 0.005, "{family} is silent");
        assert!(peak < 4.0, "{family} peaks at {peak}");
        assert_eq!(mixer.borrow().playing, 1, "{family} left a voice behind");
    }

    engine.stop_ambient();
    assert_eq!(mixer.borrow().playing, 0);
}

#[test]
fn test_volume_maps_to_headroom_gain() {
    let (mut engine, mixer) = engine();
    engine.start_ambient(NoiseFamily::Wind, 50).unwrap();
    assert!((mixer.borrow().gain - 0.15).abs() < 1e-6);

    engine.set_volume(100);
    assert!((mixer.borrow().gain - ambient_gain(100)).abs() < 1e-6);
    assert_eq!(engine.active_ambient(), Some((NoiseFamily::Wind, 100)));
}

#[test]
fn test_chime_renders_full_length() {
    let (mut engine, mixer) = engine();
    engine.play_chime().unwrap();
    engine.play_chime().unwrap();

    let expected = (RATE as f32 * CHIME_SECONDS) as usize;
    assert_eq!(mixer.borrow().chime_samples, vec![expected, expected]);
    // Chimes never touch the ambient slot
    assert_eq!(engine.active_ambient(), None);
}

#[test]
fn test_stop_before_any_start_is_harmless() {
    let handle = AudioEngineHandle::new(RATE);
    handle.stop_ambient();
    handle.stop_ambient();
    assert!(handle.flush());
    assert!(!handle.is_ambient_playing());
}

#[derive(Default)]
struct Playlist {
    starts: usize,
    live: usize,
}

/// Thread-safe backend for driving `AudioEngineHandle` without a device.
struct ListeningBackend {
    playlist: Arc<Mutex<Playlist>>,
}

struct ListeningVoice {
    playlist: Arc<Mutex<Playlist>>,
}

impl VoiceHandle for ListeningVoice {
    fn set_gain(&mut self, _gain: f32) {}

    fn stop(self) {
        self.playlist.lock().unwrap().live -= 1;
    }
}

impl OutputBackend for ListeningBackend {
    type Voice = ListeningVoice;

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn suspend(&mut self) {}

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn play_looped(&mut self, voice: ShapedVoice, _gain: f32) -> Result<ListeningVoice> {
        drop(voice);
        let mut playlist = self.playlist.lock().unwrap();
        playlist.starts += 1;
        playlist.live += 1;
        Ok(ListeningVoice {
            playlist: Arc::clone(&self.playlist),
        })
    }

    fn play_once(&mut self, _chime: Chime) -> Result<()> {
        Ok(())
    }
}

/// Handle whose audio thread waits for `open` before building its
/// backend, so every command sent before that is already queued.
fn gated_handle() -> (AudioEngineHandle, Arc<Mutex<Playlist>>, Sender<()>) {
    let playlist = Arc::new(Mutex::new(Playlist::default()));
    let (open, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);

    let shared = Arc::clone(&playlist);
    let handle = AudioEngineHandle::with_backend(RATE, move |_rate| {
        let _ = gate.lock().unwrap().recv();
        ListeningBackend {
            playlist: Arc::clone(&shared),
        }
    });
    (handle, playlist, open)
}

#[test]
fn test_queued_start_then_stop_stays_silent() {
    let (handle, playlist, open) = gated_handle();
    handle.start_ambient(NoiseFamily::Rain, 60);
    handle.stop_ambient();
    open.send(()).unwrap();

    assert!(handle.flush());
    assert_eq!(playlist.lock().unwrap().live, 0);
    assert_eq!(playlist.lock().unwrap().starts, 0);
    assert!(!handle.is_ambient_playing());
}

#[test]
fn test_queued_starts_keep_only_the_latest() {
    let (handle, playlist, open) = gated_handle();
    handle.start_ambient(NoiseFamily::Rain, 60);
    handle.start_ambient(NoiseFamily::Ocean, 40);
    open.send(()).unwrap();

    assert!(handle.flush());
    // The superseded Rain request never reached the backend
    assert_eq!(playlist.lock().unwrap().starts, 1);
    assert_eq!(playlist.lock().unwrap().live, 1);
    assert!(handle.is_ambient_playing());
}

#[test]
fn test_processed_start_then_stop_clears_playing() {
    let (handle, playlist, open) = gated_handle();
    open.send(()).unwrap();

    handle.start_ambient(NoiseFamily::Wind, 50);
    assert!(handle.flush());
    assert!(handle.is_ambient_playing());
    assert_eq!(playlist.lock().unwrap().live, 1);

    handle.stop_ambient();
    assert!(handle.flush());
    assert!(!handle.is_ambient_playing());
    assert_eq!(playlist.lock().unwrap().live, 0);
}
