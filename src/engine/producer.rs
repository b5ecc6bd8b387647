// Producer - ジョブ配信機能

use super::pool::JobSubmitter;
use crate::core::{EngineResult, WorkItem};
use tokio::task::JoinHandle;

/// Producer: 有限のジョブ列を投入し、最後にプールを締め切る
///
/// 投入できた件数を返す。途中で失敗した場合もプールは締め切る。
pub fn spawn_producer<I>(
    items: Vec<WorkItem<I>>,
    submitter: JobSubmitter<I>,
) -> JoinHandle<EngineResult<usize>>
where
    I: Send + 'static,
{
    tokio::spawn(async move {
        let mut submitted = 0;
        for item in items {
            if let Err(error) = submitter.submit(item).await {
                submitter.close();
                return Err(error);
            }
            submitted += 1;
        }
        // 締め切りでワーカーにキュー終端を知らせる
        submitter.close();
        Ok(submitted)
    })
}
