//! Cloud AI: submit a PPTX job for the uploaded file and poll it to the end.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{ExecutionContext, ModeExecutor, ProgressSignal};
use crate::clients::{PptxRequest, RemoteApi};
use crate::error::RepdfError;
use crate::pipeline::poll::{poll_until_done, PollPolicy};
use crate::pipeline::present::ResultView;
use crate::session::{FileKind, OcrMode};

pub struct CloudAiExecutor {
    api: Arc<dyn RemoteApi>,
    poll: PollPolicy,
}

impl CloudAiExecutor {
    pub fn new(api: Arc<dyn RemoteApi>, poll: PollPolicy) -> Self {
        Self { api, poll }
    }
}

#[async_trait]
impl ModeExecutor for CloudAiExecutor {
    fn mode(&self) -> OcrMode {
        OcrMode::CloudAi
    }

    fn supports(&self, _kind: FileKind) -> bool {
        true
    }

    fn map_progress(&self, signal: &ProgressSignal) -> u8 {
        match signal {
            ProgressSignal::Remote(p) => p.percent_u8(),
            ProgressSignal::Done => 100,
            _ => 0,
        }
    }

    async fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ResultView, RepdfError> {
        let file_id = ctx.file_id.ok_or(RepdfError::NotUploaded)?.to_string();

        ctx.report(self, ProgressSignal::Submitting);
        let task_id = self
            .api
            .start_pptx(&PptxRequest {
                file_id,
                output_ratio: ctx.options.output_ratio.clone(),
                remove_watermark: ctx.options.remove_watermark,
                use_local: false,
            })
            .await?;
        info!("Cloud task {} started", task_id);
        ctx.task_id = Some(task_id.clone());

        let ctx = &*ctx;
        poll_until_done(
            self.api.as_ref(),
            &task_id,
            &self.poll,
            |progress| {
                ctx.report(self, ProgressSignal::Remote(progress.clone()));
            },
            |attempt, e| {
                ctx.reporter.callback().on_poll_retry(attempt, &e.to_string());
            },
        )
        .await?;

        Ok(ResultView::Artifact {
            download_url: self.api.download_url(&task_id),
            task_id,
            original_name: ctx.file.name.clone(),
        })
    }
}
