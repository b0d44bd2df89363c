pub type LogMessage = (chrono::DateTime<chrono::Local>, String, log::Level);

pub fn message(text: impl Into<String>, level: log::Level) -> LogMessage {
    (chrono::Local::now(), text.into(), level)
}

pub fn format_log_message(message: &LogMessage) -> String {
    let (time, text, level) = message;
    format!(
        "{:} {:<5} {:}",
        time.format(&crate::DATETIME_FORMAT),
        level,
        text
    )
}

/// prints pipeline messages at or above a level to stderr, and appends them to a log file if configured
pub struct MessageLog {
    level: log::Level,
    file: Option<std::fs::File>,
}

impl MessageLog {
    pub fn new(
        configuration: &crate::configuration::RunConfiguration,
        level: log::Level,
    ) -> Result<Self, std::io::Error> {
        let file = match &configuration.log {
            Some(log) => {
                let mut path = log.filename.to_owned();
                if path.is_dir() {
                    path.push(format!(
                        "{:}_log_{:}.txt",
                        configuration.name,
                        chrono::Local::now().format("%Y%m%dT%H%M%S")
                    ));
                }
                Some(
                    std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)?,
                )
            }
            None => None,
        };

        Ok(Self { level, file })
    }

    pub fn write(&mut self, message: &LogMessage) {
        if message.2 > self.level {
            return;
        }

        let line = format_log_message(message);
        eprintln!("{:}", line);
        let failed = match &mut self.file {
            Some(file) => std::io::Write::write_all(file, format!("{:}\n", line).as_bytes()).err(),
            None => None,
        };
        if let Some(error) = failed {
            eprintln!("could not write to log file; {:}", error);
            self.file = None;
        }
    }

    pub fn write_all(&mut self, messages: &[LogMessage]) {
        for message in messages {
            self.write(message);
        }
    }
}

#[cfg(test)]
pub fn approx_equal(a: f64, b: f64, decimal_precision: u8) -> bool {
    let p = 10f64.powi(-(decimal_precision as i32));
    (a - b).abs() < p
}

pub fn duration_string(duration: &chrono::Duration) -> String {
    let mut parts = vec![];

    let hours = duration.num_hours().abs();
    let minutes = duration.num_minutes().abs() % 60;
    let seconds = duration.num_seconds().abs() % 60;
    let milliseconds = duration.num_milliseconds().abs() % 1000;

    if hours > 0 {
        parts.push(format!("{:}h", hours));
    }

    if minutes > 0 {
        parts.push(format!("{:}m", minutes));
    }

    if seconds > 0 {
        parts.push(format!("{:}s", seconds));
    }

    if milliseconds > 0 && hours == 0 && minutes == 0 {
        parts.push(format!("{:}ms", milliseconds));
    }

    if parts.is_empty() {
        return "0s".to_string();
    }

    parts.join(" ")
}
