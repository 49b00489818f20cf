// Phase 6: 呼び出し側の期限。ページ単位ではなく呼び出し全体を打ち切る。

use std::time::{Duration, Instant};

use crate::error::PdfCompressError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// 現在時刻から `limit` 後に期限切れになる。
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// 期限切れなら `Timeout` を返す。
    pub fn check(&self) -> crate::error::Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.limit {
            return Err(PdfCompressError::Timeout {
                elapsed_secs: elapsed.as_secs_f64(),
            });
        }
        Ok(())
    }
}
