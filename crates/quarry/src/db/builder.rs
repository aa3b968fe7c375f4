use super::{Db, Options, Shared};
use crate::{Capability, Executor, Registry, Result};

use quarry_core::err;

use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    registry: Option<Registry>,
    executor: Option<Arc<dyn Executor>>,
    options: Options,
}

impl Builder {
    /// Entity metadata queries are resolved against
    pub fn registry(&mut self, registry: Registry) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    pub fn executor(&mut self, executor: impl Executor) -> &mut Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    pub fn build(&mut self) -> Result<Db> {
        let registry = self
            .registry
            .take()
            .ok_or_else(|| err!("a registry is required to build a Db"))?;
        let executor = self
            .executor
            .take()
            .ok_or_else(|| err!("an executor is required to build a Db"))?;
        let options = std::mem::take(&mut self.options);

        let base = match options.dialect {
            Some(dialect) => dialect.capability(),
            None => executor.capability(),
        };
        let capability = Capability {
            isolate_where_statements: base.isolate_where_statements
                || options.isolate_where_statements,
            ..base.clone()
        };

        Ok(Db {
            shared: Arc::new(Shared {
                registry: Arc::new(registry),
                executor,
                capability,
                options,
            }),
        })
    }
}
