use crate::config::ProgressConfig;
use crate::events::{EventBus, EventHandler};
use crate::filters::SearchFilter;
use crate::search::SearchEngine;
use crate::statistic::SearchStatistic;
use reweave_core::{Dataset, Executor, FitManager, SearchDirection, parse_model};
use reweave_error::{Error, Result};
use std::sync::{Arc, Mutex};

/// Fluent configuration for a [SearchEngine].
///
/// ```no_run
/// use reweave_engines::*;
/// use reweave_core::{Dataset, SearchDirection};
///
/// let dataset: Dataset = unimplemented!();
/// let mut engine = SearchEngine::builder()
///     .dataset(&dataset)
///     .unwrap()
///     .filter(SearchFilter::Loopless)
///     .statistic(SearchStatistic::Bic)
///     .direction(SearchDirection::Ascending)
///     .width(3)
///     .levels(7)
///     .build()
///     .unwrap();
/// let report = engine.run().unwrap();
/// ```
pub struct SearchBuilder {
    manager: Option<FitManager>,
    filter: SearchFilter,
    statistic: SearchStatistic,
    width: usize,
    levels: usize,
    direction: SearchDirection,
    executor: Option<Executor>,
    progress: ProgressConfig,
    handlers: Vec<Arc<Mutex<dyn EventHandler>>>,
    start: Option<String>,
}

impl Default for SearchBuilder {
    fn default() -> Self {
        SearchBuilder {
            manager: None,
            filter: SearchFilter::Loopless,
            statistic: SearchStatistic::Bic,
            width: 3,
            levels: 7,
            direction: SearchDirection::default(),
            executor: None,
            progress: ProgressConfig::default(),
            handlers: Vec::new(),
            start: None,
        }
    }
}

impl SearchBuilder {
    pub fn manager(mut self, manager: FitManager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn dataset(mut self, dataset: &Dataset) -> Result<Self> {
        self.manager = Some(FitManager::from_dataset(dataset)?);
        Ok(self)
    }

    pub fn filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn statistic(mut self, statistic: SearchStatistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Run every level sequentially on the driver thread.
    pub fn sequential(mut self) -> Self {
        self.executor = Some(Executor::serial());
        self
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    pub fn on_event<H>(mut self, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.handlers.push(Arc::new(Mutex::new(handler)));
        self
    }

    pub fn subscribe(mut self, handler: Arc<Mutex<dyn EventHandler>>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Start model in model notation, parsed against the dataset's
    /// variables at build time. Defaults to the direction's reference
    /// model.
    pub fn start_model(mut self, notation: impl Into<String>) -> Self {
        self.start = Some(notation.into());
        self
    }

    pub fn build(self) -> Result<SearchEngine> {
        let manager = self
            .manager
            .ok_or_else(|| Error::validation("search needs a dataset or a fit manager"))?
            .with_direction(self.direction);
        if self.width == 0 {
            return Err(Error::validation("beam width must be at least 1"));
        }
        if self.levels == 0 {
            return Err(Error::validation("search needs at least one level"));
        }

        let start = match &self.start {
            Some(notation) => Some(parse_model(notation, manager.vars())?),
            None => None,
        };

        let enabled = self.progress.enabled && !self.handlers.is_empty();
        let bus = EventBus::new(self.handlers, enabled);

        Ok(SearchEngine {
            manager,
            filter: self.filter,
            statistic: self.statistic,
            width: self.width,
            levels: self.levels,
            executor: self.executor.unwrap_or_else(Executor::default_parallel),
            progress: self.progress,
            bus,
            start,
        })
    }
}
