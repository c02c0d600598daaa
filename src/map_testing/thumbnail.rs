use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use bytes::Bytes;
use dashmap::DashSet;
use poise::serenity_prelude::MessageId;
use tokio::{fs, process::Command};
use tracing::{debug, warn};

pub const DEFAULT_WIDTH: u32 = 1280;

/// Renders map previews with the external `render_map` tool.
///
/// Every render uses `<scratch dir>/<message id>.map` as its input, and the tool puts
/// the image next to it as `<message id>.map.png`. The tool reports problems by
/// printing them to stdout, so any output at all means the render failed.
pub struct ThumbnailRenderer {
    scratch_dir: PathBuf,
    program: PathBuf,
    args: Vec<String>,
    width: u32,
    in_flight: DashSet<MessageId>,
}

impl ThumbnailRenderer {
    pub fn new(scratch_dir: PathBuf, program: PathBuf, args: Vec<String>, width: u32) -> Self {
        ThumbnailRenderer {
            scratch_dir,
            program,
            args,
            width,
            in_flight: DashSet::new(),
        }
    }

    pub fn scratch_path(&self, key: MessageId) -> PathBuf {
        self.scratch_dir.join(format!("{key}.map"))
    }

    /// Returns the PNG preview of the map, or `None` if it couldn't be rendered.
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    pub async fn render(&self, filename: &str, key: MessageId, content: &[u8]) -> Option<Bytes> {
        if !self.in_flight.insert(key) {
            warn!("Thumbnail of map {filename:?} ({key}) is already being rendered");
            return None;
        }

        let thumbnail = self.render_file(filename, key, content).await;
        self.in_flight.remove(&key);
        thumbnail
    }

    async fn render_file(&self, filename: &str, key: MessageId, content: &[u8]) -> Option<Bytes> {
        let input = self.scratch_path(key);
        if let Err(err) = fs::write(&input, content).await {
            warn!("Could not write {input:?} to render map {filename:?} ({key}): {err}");
            return None;
        }

        let output = match Command::new(&self.program)
            .args(&self.args)
            .arg(&input)
            .arg("--size")
            .arg(self.width.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                warn!("Could not run {:?} for map {filename:?} ({key}): {err}", self.program);
                return None;
            }
        };

        // Exit status is meaningless here, only stdout tells whether it worked.
        let report = String::from_utf8_lossy(&output.stdout);
        if !report.is_empty() {
            let report = report.lines().collect::<Vec<_>>().join(" ");
            warn!("Failed to generate thumbnail of map {filename:?} ({key}): {report}");
            return None;
        }

        let image_path = png_path(&input);
        let image = match fs::read(&image_path).await {
            Ok(image) => Bytes::from(image),
            Err(err) => {
                warn!("Could not read rendered thumbnail {image_path:?}: {err}");
                return None;
            }
        };

        for path in [&input, &image_path] {
            if let Err(err) = fs::remove_file(path).await {
                warn!("Could not remove {path:?}: {err}");
            }
        }

        debug!("Rendered thumbnail of map {filename:?} ({} bytes)", image.len());
        Some(image)
    }
}

fn png_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".png");
    PathBuf::from(path)
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        io,
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use poise::serenity_prelude::MessageId;
    use tempfile::TempDir;
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    use crate::map_testing::thumbnail::{ThumbnailRenderer, DEFAULT_WIDTH};

    /// Stands in for `render_map`: copies the map into the PNG, unless the map is
    /// called `broken`, in which case it complains on stdout.
    const FAKE_RENDER_MAP: &str = r#"
        case "$(cat "$1")" in
            broken) echo "map is broken"; echo "second line" ;;
            *) echo "ignored noise" >&2; cp "$1" "$1.png" ;;
        esac
    "#;

    fn renderer(script: &str) -> (TempDir, ThumbnailRenderer) {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("render_map.sh");
        std::fs::write(&script_path, script).unwrap();

        let renderer = ThumbnailRenderer::new(
            dir.path().to_owned(),
            PathBuf::from("sh"),
            vec![script_path.to_string_lossy().into_owned()],
            DEFAULT_WIDTH,
        );
        (dir, renderer)
    }

    /// Log lines written while it is the thread's default subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(Level::WARN)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    #[test_log::test(tokio::test)]
    async fn successful_render_returns_image_and_cleans_up() {
        let (_dir, renderer) = renderer(FAKE_RENDER_MAP);
        let key = MessageId::new(111);

        let thumbnail = renderer.render("Name.map", key, b"good map").await;

        assert_eq!(thumbnail.as_deref(), Some(&b"good map"[..]));
        let input = renderer.scratch_path(key);
        assert!(!exists(&input));
        assert!(!exists(input.with_extension("map.png")));
    }

    #[test_log::test(tokio::test)]
    async fn output_on_stdout_means_failure() {
        let (_dir, renderer) = renderer(FAKE_RENDER_MAP);
        let key = MessageId::new(222);

        let thumbnail = renderer.render("Broken.map", key, b"broken").await;

        assert_eq!(thumbnail, None);
        // The input stays behind after a failed render.
        assert!(exists(renderer.scratch_path(key)));
    }

    #[tokio::test]
    async fn failed_render_is_logged_as_warning() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let (_dir, renderer) = renderer(FAKE_RENDER_MAP);

        let (good, broken) = tokio::join!(
            renderer.render("Good.map", MessageId::new(31), b"good map"),
            renderer.render("Broken.map", MessageId::new(32), b"broken"),
        );

        assert!(good.is_some());
        assert_eq!(broken, None);

        let logs = logs.contents();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(
            logs.contains(
                r#"Failed to generate thumbnail of map "Broken.map" (32): map is broken second line"#
            ),
            "{logs}"
        );
        assert!(!logs.contains("Good.map"), "{logs}");
    }

    #[test_log::test(tokio::test)]
    async fn width_is_passed_to_the_tool() {
        let (_dir, renderer) = renderer(
            r#"[ "$2" = "--size" ] && [ "$3" = "1280" ] && printf ok > "$1.png" || echo "bad args""#,
        );

        let thumbnail = renderer.render("Name.map", MessageId::new(5), b"map").await;

        assert_eq!(thumbnail.as_deref(), Some(&b"ok"[..]));
    }

    #[test_log::test(tokio::test)]
    async fn missing_tool_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ThumbnailRenderer::new(
            dir.path().to_owned(),
            dir.path().join("does-not-exist"),
            Vec::new(),
            DEFAULT_WIDTH,
        );

        assert_eq!(renderer.render("Name.map", MessageId::new(1), b"map").await, None);
    }

    #[test_log::test(tokio::test)]
    async fn missing_scratch_dir_is_not_fatal() {
        let (dir, _) = renderer(FAKE_RENDER_MAP);
        let renderer = ThumbnailRenderer::new(
            dir.path().join("missing"),
            PathBuf::from("sh"),
            vec![dir.path().join("render_map.sh").to_string_lossy().into_owned()],
            DEFAULT_WIDTH,
        );

        assert_eq!(renderer.render("Name.map", MessageId::new(1), b"map").await, None);
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_renders_do_not_interfere() {
        let (_dir, renderer) = renderer(FAKE_RENDER_MAP);

        let (good, broken) = tokio::join!(
            renderer.render("Good.map", MessageId::new(1), b"good map"),
            renderer.render("Broken.map", MessageId::new(2), b"broken"),
        );

        assert_eq!(good.as_deref(), Some(&b"good map"[..]));
        assert_eq!(broken, None);
        assert!(!exists(renderer.scratch_path(MessageId::new(1))));
        assert!(exists(renderer.scratch_path(MessageId::new(2))));
    }

    #[test_log::test(tokio::test)]
    async fn key_in_flight_is_refused() {
        let (_dir, renderer) = renderer(FAKE_RENDER_MAP);
        let key = MessageId::new(3);
        renderer.in_flight.insert(key);

        assert_eq!(renderer.render("Name.map", key, b"good map").await, None);
        assert!(!exists(renderer.scratch_path(key)));
    }
}
