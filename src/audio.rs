//! Success chime playback.
//!
//! Kiosks rarely have a predictable audio stack, so the chime is played by
//! whichever system player is installed. A missing file or missing player
//! is never fatal: the grant still renders, the miss is just logged.

use std::path::Path;
use std::process::{Command, Stdio};

/// Players tried in order; the first one that spawns wins.
const PLAYERS: &[&str] = &["paplay", "pw-play", "aplay", "ffplay", "mpv"];

/// Extra flags some players need to run headless and quiet.
fn player_args<'a>(player: &str, path: &'a str) -> Vec<&'a str> {
    match player {
        "ffplay" => vec!["-nodisp", "-autoexit", "-loglevel", "quiet", path],
        "mpv" => vec!["--no-video", "--really-quiet", path],
        _ => vec![path],
    }
}

/// Fire-and-forget playback of the chime at `path`.
pub fn play_chime(path: &Path) {
    if !path.exists() {
        tracing::warn!("chime file not found: {}", path.display());
        return;
    }

    let path_str = path.to_string_lossy();
    for player in PLAYERS {
        match Command::new(player)
            .args(player_args(player, &path_str))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => {
                tracing::debug!("playing chime via {}", player);
                return;
            }
            Err(_) => continue,
        }
    }

    tracing::warn!(
        "no audio player found (tried {}), skipping chime",
        PLAYERS.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_tolerated() {
        // Must not panic or spawn anything
        play_chime(Path::new("/nonexistent/garita-chime.wav"));
    }

    #[test]
    fn player_args_quiet_the_noisy_players() {
        assert!(player_args("ffplay", "x.wav").contains(&"-nodisp"));
        assert!(player_args("mpv", "x.wav").contains(&"--no-video"));
        assert_eq!(player_args("paplay", "x.wav"), vec!["x.wav"]);
    }
}
