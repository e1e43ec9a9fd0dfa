use chrono::{Local, NaiveDateTime};

pub fn now() -> NaiveDateTime {
  Local::now().naive_local()
}

// Human readable size, e.g. "512 Bytes", "1.5 KB", "2.0 GB"
pub fn round_size(size: i64) -> String {
  if size < 1024 {
    return format!("{} Bytes", size);
  }

  let mut n = size as f64 / 1024.0;
  for unit in ["KB", "MB"] {
    if n < 1024.0 {
      return format!("{:.1} {}", n, unit);
    }
    n /= 1024.0;
  }
  format!("{:.1} GB", n)
}

// Duration in seconds as "H:MM:SS", with microseconds and days when present
// e.g. "0:01:05", "1:02:05.500000", "1 day, 0:00:01"
pub fn format_duration(secs: f64) -> String {
  let total_micros = (secs * 1_000_000.0).round() as i64;
  let micros = total_micros.rem_euclid(1_000_000);
  let total_secs = total_micros.div_euclid(1_000_000);
  let days = total_secs.div_euclid(86_400);
  let rem = total_secs.rem_euclid(86_400);

  let mut out = String::new();
  if days != 0 {
    let plural = if days.abs() == 1 { "" } else { "s" };
    out.push_str(&format!("{} day{}, ", days, plural));
  }
  out.push_str(&format!(
    "{}:{:02}:{:02}",
    rem / 3600,
    (rem % 3600) / 60,
    rem % 60
  ));
  if micros != 0 {
    out.push_str(&format!(".{:06}", micros));
  }
  out
}

// Non-empty lines, trimmed and joined with a single space
pub fn clean_text(text: &str) -> String {
  text
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
