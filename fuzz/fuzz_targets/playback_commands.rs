#![no_main]

use libfuzzer_sys::fuzz_target;
use tunedeck::{
    MediaEvent, NullMediaSource, PlaybackController, PlayerCommand, Track, TrackOrigin,
};

fuzz_target!(|data: &[u8]| {
    let mut controller = PlaybackController::with_seed(NullMediaSource::new(), 0);
    let len = data.len() % 32;
    controller.add_tracks((0..len).map(|idx| {
        Track::new(format!("track_{idx}.mp3"), TrackOrigin::Discovered)
    }));

    for pair in data.chunks(2) {
        let arg = usize::from(pair.get(1).copied().unwrap_or_default());
        let _ = match pair[0] % 11 {
            0 => controller.apply(PlayerCommand::Select(arg % 40)),
            1 => controller.apply(PlayerCommand::Remove(arg % 40)),
            2 => controller.apply(PlayerCommand::TogglePlay),
            3 => controller.apply(PlayerCommand::Next),
            4 => controller.apply(PlayerCommand::Previous),
            5 => controller.apply(PlayerCommand::ToggleShuffle),
            6 => controller.apply(PlayerCommand::ToggleRepeat),
            7 => controller.apply(PlayerCommand::SeekFraction(arg as f64 / 255.0)),
            8 => controller.handle_event(MediaEvent::Ended).map(|_| ()),
            9 => controller
                .handle_event(MediaEvent::TimeUpdate {
                    current: arg as f64,
                    duration: Some(120.0),
                })
                .map(|_| ()),
            _ => {
                let added = controller.add_tracks([Track::new(
                    format!("extra_{arg}.mp3"),
                    TrackOrigin::Uploaded,
                )]);
                assert!(added <= 1);
                Ok(())
            }
        };

        let state = controller.state();
        match state.current {
            Some(index) => assert!(index < controller.playlist().len()),
            None => assert!(controller.playlist().is_empty()),
        }
    }
});
