//! Stand-in transcoder scripts so tests never need a real ffmpeg.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable `ffmpeg-<mode>` script into `dir`.
///
/// Every mode answers `-version`. Otherwise the last argument is the
/// output path, as in the real argument template.
pub fn stand_in_transcoder(dir: &Path, mode: &str) -> PathBuf {
    let behaviour = match mode {
        "succeed" => "printf 'converted' > \"$last\"\nexit 0",
        "fail" => {
            "echo '[mov,mp4,m4a] moov atom not found' >&2\n\
             echo 'Invalid data found when processing input' >&2\n\
             exit 1"
        }
        "fail_partial" => "printf 'partial' > \"$last\"\necho 'Conversion failed!' >&2\nexit 1",
        "silent" => "exit 0",
        "hang" => "exec sleep 30",
        "noisy" => {
            "i=0\n\
             while [ $i -lt 2000 ]; do echo \"line $i of diagnostic noise\" >&2; i=$((i+1)); done\n\
             exit 1"
        }
        other => panic!("unknown stand-in mode {other}"),
    };

    let script = format!(
        "#!/bin/sh\n\
         if [ \"$1\" = \"-version\" ]; then echo 'ffmpeg version stand-in'; echo 'configuration: none'; exit 0; fi\n\
         for last; do :; done\n\
         {behaviour}\n"
    );

    let path = dir.join(format!("ffmpeg-{mode}"));
    std::fs::write(&path, script).expect("write stand-in script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod stand-in script");
    path
}
