use anyhow::{Context, Result};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type LogFile = Arc<Mutex<BufWriter<fs::File>>>;

/// `<dir>/<prefix>_YYYYmmdd_HHMMSS.log` を作成
pub fn open_log_file<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<LogFile> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{}_{}.log", prefix, ts));
    let file = fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    eprintln!("Log: {}", path.display());
    Ok(Arc::new(Mutex::new(BufWriter::new(file))))
}

/// 標準出力とログファイルの両方に書く
#[macro_export]
macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!($($arg)*);
        println!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "[{}] {}", chrono::Local::now().format("%H:%M:%S%.3f"), msg);
            let _ = f.flush();
        }
    }};
}
