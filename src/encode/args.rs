use std::ffi::OsString;
use std::path::PathBuf;

use crate::foundation::core::OutputTarget;

/// Configuration for the encoder subprocess.
///
/// The derived argument list is a pure function of this struct; see [`encoder_args`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder executable, resolved on the search path when not an absolute path.
    pub ffmpeg_path: PathBuf,
    /// Output frame rate.
    pub fps: u32,
    /// Optional media file supplying an audio track to copy into the output untouched.
    pub audio_path: Option<PathBuf>,
    /// Optional sizing hint for the encoder's stdin packet queue.
    pub thread_queue_size: Option<u32>,
    /// Where the encoded video goes.
    pub output: OutputTarget,
    /// Forward the subprocess's stdout/stderr to this process's own streams.
    pub pipe_output: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            fps: 60,
            audio_path: None,
            thread_queue_size: None,
            output: OutputTarget::Stdout,
            pipe_output: false,
        }
    }
}

/// Build the encoder's command-line argument list.
///
/// The order is part of the contract with drop-in `ffmpeg` replacements: overwrite flag, optional
/// audio input, frame rate, optional thread queue size, stdin video input, alpha-capable pixel
/// format, optional audio mapping, output target. With audio present the audio file is input 0
/// and the stdin video stream is input 1, so the mapping takes video from input 1 and copies
/// audio from input 0 without re-encoding.
pub fn encoder_args(config: &EncoderConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into()];
    if let Some(audio) = &config.audio_path {
        args.push("-i".into());
        args.push(audio.clone().into_os_string());
    }
    args.push("-r".into());
    args.push(config.fps.to_string().into());
    if let Some(size) = config.thread_queue_size {
        args.push("-thread_queue_size".into());
        args.push(size.to_string().into());
    }
    args.push("-i".into());
    args.push("-".into());
    args.push("-pix_fmt".into());
    args.push("yuva420p".into());
    if config.audio_path.is_some() {
        args.push("-map".into());
        args.push("1:v".into());
        args.push("-map".into());
        args.push("0:a".into());
        args.push("-c:a".into());
        args.push("copy".into());
    }
    match &config.output {
        OutputTarget::File(path) => args.push(path.clone().into_os_string()),
        OutputTarget::Stdout => args.push("-".into()),
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(args: &[OsString]) -> Vec<&str> {
        args.iter().map(|a| a.to_str().unwrap()).collect()
    }

    #[test]
    fn minimal_config_streams_stdin_to_stdout() {
        let args = encoder_args(&EncoderConfig::default());
        assert_eq!(
            strs(&args),
            vec!["-y", "-r", "60", "-i", "-", "-pix_fmt", "yuva420p", "-"]
        );
    }

    #[test]
    fn audio_input_comes_first_and_is_mapped_with_copy() {
        let config = EncoderConfig {
            fps: 30,
            audio_path: Some(PathBuf::from("bgm.mp3")),
            output: OutputTarget::File(PathBuf::from("out.mov")),
            ..EncoderConfig::default()
        };
        assert_eq!(
            strs(&encoder_args(&config)),
            vec![
                "-y", "-i", "bgm.mp3", "-r", "30", "-i", "-", "-pix_fmt", "yuva420p", "-map",
                "1:v", "-map", "0:a", "-c:a", "copy", "out.mov"
            ]
        );
    }

    #[test]
    fn thread_queue_size_precedes_the_stdin_input() {
        let config = EncoderConfig {
            thread_queue_size: Some(512),
            ..EncoderConfig::default()
        };
        assert_eq!(
            strs(&encoder_args(&config)),
            vec![
                "-y",
                "-r",
                "60",
                "-thread_queue_size",
                "512",
                "-i",
                "-",
                "-pix_fmt",
                "yuva420p",
                "-"
            ]
        );
    }

    #[test]
    fn argument_list_is_a_pure_function_of_config() {
        let config = EncoderConfig {
            fps: 24,
            audio_path: Some(PathBuf::from("a.wav")),
            thread_queue_size: Some(128),
            output: OutputTarget::File(PathBuf::from("v.mov")),
            ..EncoderConfig::default()
        };
        assert_eq!(encoder_args(&config), encoder_args(&config));
    }
}
