pub struct TaskRunner {
    tasks: Vec<(&'static str, Box<dyn FnOnce() + Send>)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks.push((name, Box::new(task)));
    }

    pub fn start_all(self) {
        for (name, task) in self.tasks {
            println!("Starting task: {}", name);
            task();
        }
    }
}
