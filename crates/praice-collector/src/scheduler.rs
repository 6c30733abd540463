//! 작업 스케줄러.
//!
//! `tokio-cron-scheduler` 위에 작업을 등록하고, 세마포어로 동시 실행 수를 제한합니다.
//! Ctrl-C를 받으면 새 트리거를 멈추고 실행 중인 작업이 끝날 때까지 기다립니다.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_cron_scheduler::{Job, JobBuilder, JobScheduler};

use crate::jobs::{JobContext, JobKind, Trigger};
use crate::{CollectorError, Result};

/// 정기 작업 스케줄러
pub struct Scheduler {
    inner: JobScheduler,
    ctx: Arc<JobContext>,
    permits: Arc<Semaphore>,
    max_permits: usize,
    registered: Vec<JobKind>,
}

impl Scheduler {
    pub async fn new(ctx: JobContext) -> Result<Self> {
        let max_permits = ctx.config.scheduler.max_concurrent_jobs;
        if max_permits == 0 {
            return Err(CollectorError::Config(
                "max_concurrent_jobs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            inner: JobScheduler::new().await?,
            ctx: Arc::new(ctx),
            permits: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            registered: Vec::new(),
        })
    }

    /// 등록된 작업 목록
    pub fn registered(&self) -> &[JobKind] {
        &self.registered
    }

    /// 현재 사용 가능한 실행 슬롯 수
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// 모든 작업을 설정된 트리거로 등록합니다.
    pub async fn register_all(&mut self) -> Result<()> {
        for kind in JobKind::ALL {
            self.register(kind).await?;
        }
        Ok(())
    }

    /// 작업 하나를 등록합니다.
    pub async fn register(&mut self, kind: JobKind) -> Result<()> {
        let trigger = kind.trigger(&self.ctx.config);
        let job = self.build_job(kind, &trigger)?;
        self.inner.add(job).await?;
        self.registered.push(kind);

        match trigger {
            Trigger::Every(interval) => tracing::info!(
                job = kind.name(),
                interval = format!("{}m", interval.as_secs() / 60),
                "작업 등록"
            ),
            Trigger::Cron(cron) => {
                tracing::info!(job = kind.name(), cron = %cron, timezone = "UTC", "작업 등록")
            }
        }
        Ok(())
    }

    fn build_job(&self, kind: JobKind, trigger: &Trigger) -> Result<Job> {
        let ctx = self.ctx.clone();
        let permits = self.permits.clone();

        let job = match trigger {
            Trigger::Every(interval) => Job::new_repeated_async(*interval, move |_uuid, _l| {
                let ctx = ctx.clone();
                let permits = permits.clone();
                Box::pin(async move {
                    run_guarded(kind, ctx, permits).await;
                })
            })?,
            Trigger::Cron(cron) => JobBuilder::new()
                .with_timezone(chrono_tz::UTC)
                .with_cron_job_type()
                .with_schedule(cron.as_str())?
                .with_run_async(Box::new(move |_uuid, _l| {
                    let ctx = ctx.clone();
                    let permits = permits.clone();
                    Box::pin(async move {
                        run_guarded(kind, ctx, permits).await;
                    })
                }))
                .build()?,
        };
        Ok(job)
    }

    /// 등록된 작업을 한 번씩 즉시 실행합니다 (백그라운드).
    pub fn trigger_all_now(&self) {
        for kind in self.registered.iter().copied() {
            let ctx = self.ctx.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                run_guarded(kind, ctx, permits).await;
            });
        }
    }

    /// 트리거를 시작합니다. `run_on_start`가 켜져 있으면 모든 작업을 한 번 즉시 실행합니다.
    pub async fn start(&self) -> Result<()> {
        self.inner.start().await?;
        tracing::info!(
            jobs = self.registered.len(),
            max_concurrent_jobs = self.max_permits,
            "스케줄러 시작"
        );

        if self.ctx.config.scheduler.run_on_start {
            self.trigger_all_now();
        }
        Ok(())
    }

    /// 스케줄러를 시작하고 Ctrl-C까지 실행합니다.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        self.start().await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "종료 신호 대기 실패");
        }
        tracing::info!("종료 신호 수신, 스케줄러 종료 중...");

        self.shutdown().await
    }

    /// 새 트리거를 멈추고 실행 중인 작업이 끝날 때까지 기다립니다.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;

        let in_flight = self.max_permits - self.permits.available_permits();
        if in_flight > 0 {
            tracing::info!(in_flight = in_flight, "실행 중인 작업 대기");
        }

        let permits = u32::try_from(self.max_permits).unwrap_or(u32::MAX);
        match self.permits.acquire_many(permits).await {
            Ok(all) => {
                all.forget();
                self.permits.close();
            }
            Err(_) => tracing::debug!("세마포어가 이미 닫힘"),
        }

        tracing::info!("스케줄러 종료 완료");
        Ok(())
    }
}

/// 실행 슬롯을 얻은 뒤 작업을 실행합니다. 종료 중이면 건너뜁니다.
async fn run_guarded(kind: JobKind, ctx: Arc<JobContext>, permits: Arc<Semaphore>) {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::debug!(job = kind.name(), "종료 중, 작업 건너뜀");
            return;
        }
    };
    kind.run(&ctx).await;
}
