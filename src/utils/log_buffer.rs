//! 内存日志缓冲
//!
//! 作为 tracing 的一个输出层，把每条日志脱敏后追加到固定容量的环形缓冲里，
//! 供控制面按序号增量拉取。

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use regex::Regex;
use serde::Serialize;
use tracing_subscriber::fmt::writer::MakeWriter;

/// 默认保留的日志条数
pub const DEFAULT_CAPACITY: usize = 1000;

const REDACTED: &str = "[REDACTED]";

/// 证件号、手机号一类的长数字串（允许每 4 位用空格或短横线分隔）
static LONG_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{4}[ -]?){2,}\d{4}\b|\b\d{10,}\b").expect("valid regex")
});
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid regex")
});

/// 一条日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub seq: u64,
    /// `%H:%M:%S`
    pub ts: String,
    pub msg: String,
}

/// 增量拉取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogBatch {
    pub items: Vec<LogEntry>,
    /// 当前最大序号，下次拉取时传回
    pub last_seq: u64,
}

/// 脱敏：长数字串和邮箱替换为 `[REDACTED]`
pub fn redact(message: &str) -> String {
    let message = EMAIL.replace_all(message, REDACTED);
    LONG_NUMBER.replace_all(&message, REDACTED).into_owned()
}

struct Ring {
    entries: VecDeque<LogEntry>,
    last_seq: u64,
    capacity: usize,
}

/// 线程安全的日志环形缓冲
#[derive(Clone)]
pub struct LogBuffer {
    ring: Arc<Mutex<Ring>>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                last_seq: 0,
                capacity: capacity.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 追加一条日志（先脱敏），返回分配的序号
    pub fn push(&self, message: &str) -> u64 {
        let msg = redact(message.trim_end());
        let ts = chrono::Local::now().format("%H:%M:%S").to_string();
        let mut ring = self.lock();
        ring.last_seq += 1;
        let seq = ring.last_seq;
        if ring.entries.len() >= ring.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(LogEntry { seq, ts, msg });
        seq
    }

    /// 序号大于 `seq` 的全部日志
    pub fn since(&self, seq: u64) -> LogBatch {
        let ring = self.lock();
        LogBatch {
            items: ring
                .entries
                .iter()
                .filter(|e| e.seq > seq)
                .cloned()
                .collect(),
            last_seq: ring.last_seq,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 写入本缓冲的 writer
    pub fn writer(&self) -> LogBufferWriter {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

/// 每次 write 对应一条格式化后的日志事件
pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.buffer.push(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_aadhaar_mobile_and_email() {
        assert_eq!(redact("id 1234 5678 9012 ok"), "id [REDACTED] ok");
        assert_eq!(redact("id 123456789012"), "id [REDACTED]");
        assert_eq!(redact("call 9876543210"), "call [REDACTED]");
        assert_eq!(redact("mail rama@example.com now"), "mail [REDACTED] now");
        assert_eq!(redact("[成员 3] 517501"), "[成员 3] 517501");
    }

    #[test]
    fn test_since_returns_newer_entries_only() {
        let buffer = LogBuffer::default();
        buffer.push("a");
        let seq = buffer.push("b");
        buffer.push("c");

        let batch = buffer.since(seq);
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].msg, "c");
        assert_eq!(batch.last_seq, 3);
        assert!(buffer.since(3).items.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let buffer = LogBuffer::with_capacity(2);
        for msg in ["1st", "2nd", "3rd"] {
            buffer.push(msg);
        }
        let batch = buffer.since(0);
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].msg, "2nd");
        assert_eq!(batch.items[0].seq, 2);
    }

    #[test]
    fn test_writer_splits_lines() {
        let buffer = LogBuffer::default();
        let mut writer = buffer.writer();
        writer.write_all(b"first\nsecond\n").unwrap();
        assert_eq!(buffer.len(), 2);
    }
}
