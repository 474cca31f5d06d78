use std::rc::Rc;

use crate::counter::Counter;
use crate::errors::CounterResult;
use crate::repository::CounterRepository;

#[derive(Clone)]
pub struct GetCounterUseCase {
    repository: Rc<dyn CounterRepository>,
}

impl GetCounterUseCase {
    pub fn new(repository: Rc<dyn CounterRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(&self, id: &str) -> CounterResult<Counter> {
        self.repository.get(id)
    }
}

#[derive(Clone)]
pub struct SaveCounterUseCase {
    repository: Rc<dyn CounterRepository>,
}

impl SaveCounterUseCase {
    pub fn new(repository: Rc<dyn CounterRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(&self, counter: &Counter) -> CounterResult<Counter> {
        self.repository.save(counter)
    }
}
