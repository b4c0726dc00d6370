//! The bounded FIFO worker pool and fence barrier (design doc C6).
//!
//! Translated from `cc_threadpool.h`'s semaphore-based queue: Rust's
//! standard library has no raw counting semaphore, so `empty_slots` /
//! `filled_slots` become a `Mutex<VecDeque<Task>>` with two [`Condvar`]s
//! (`not_full`, `not_empty`) standing in for `sem_wait`/`sem_post` pairs on
//! each side of the queue. A `Task::Shutdown` variant replaces the
//! null-function-pointer sentinel.
//!
//! One pool is created once per process and `fence()` is
//! called between targets instead of tearing the pool down and rebuilding
//! it per target, as the original tool does — see the redesign note in
//! the design doc.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Default bounded-queue capacity (`CC_THREADPOOL_QUEUE_CAPACITY` in the
/// original).
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Task {
    Job(Job),
    Fence,
    Shutdown,
}

struct Queue {
    tasks: VecDeque<Task>,
    capacity: usize,
}

#[derive(Default)]
struct FenceState {
    generation: u64,
    arrived: usize,
}

struct Shared {
    queue: Mutex<Queue>,
    not_full: Condvar,
    not_empty: Condvar,
    fence: Mutex<FenceState>,
    fence_cv: Condvar,
    nthreads: usize,
}

/// A fixed-size worker pool with a bounded FIFO task queue and a fence
/// barrier for draining all outstanding work before starting the next
/// phase.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `nthreads` workers (minimum 1) backed by a queue of
    /// `capacity` slots.
    pub fn new(nthreads: usize, capacity: usize) -> Self {
        let nthreads = nthreads.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue { tasks: VecDeque::with_capacity(capacity), capacity }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            fence: Mutex::new(FenceState::default()),
            fence_cv: Condvar::new(),
            nthreads,
        });

        let workers = (0..nthreads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        ThreadPool { shared, workers }
    }

    /// Submits a job for execution. Blocks if the queue is full.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        enqueue(&self.shared, Task::Job(Box::new(job)));
    }

    /// Blocks until every task submitted before this call has completed.
    ///
    /// Implemented by enqueuing one `Task::Fence` per worker (so the fence
    /// tasks themselves drain in FIFO order behind all earlier work), then
    /// waiting for the pool-wide fence generation to advance. A generation
    /// counter rather than a boolean flag lets back-to-back fences run
    /// without losing a wakeup: each call captures the generation before
    /// enqueuing, so it can tell "the barrier I'm waiting for" apart from
    /// "a barrier some other caller already passed".
    pub fn fence(&self) {
        let generation = {
            let state = self.shared.fence.lock().unwrap();
            state.generation
        };
        for _ in 0..self.shared.nthreads {
            enqueue(&self.shared, Task::Fence);
        }
        let mut state = self.shared.fence.lock().unwrap();
        while state.generation == generation {
            state = self.shared.fence_cv.wait(state).unwrap();
        }
    }

    /// Enqueues one shutdown sentinel per worker and joins all of them.
    pub fn shutdown(mut self) {
        for _ in 0..self.shared.nthreads {
            enqueue(&self.shared, Task::Shutdown);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for _ in 0..self.shared.nthreads {
            enqueue(&self.shared, Task::Shutdown);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn enqueue(shared: &Shared, task: Task) {
    let mut queue = shared.queue.lock().unwrap();
    while queue.tasks.len() >= queue.capacity {
        queue = shared.not_full.wait(queue).unwrap();
    }
    queue.tasks.push_back(task);
    shared.not_empty.notify_one();
}

fn dequeue(shared: &Shared) -> Task {
    let mut queue = shared.queue.lock().unwrap();
    while queue.tasks.is_empty() {
        queue = shared.not_empty.wait(queue).unwrap();
    }
    let task = queue.tasks.pop_front().expect("queue checked non-empty");
    shared.not_full.notify_one();
    task
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        match dequeue(&shared) {
            Task::Job(job) => job(),
            Task::Fence => arrive_at_fence(&shared),
            Task::Shutdown => break,
        }
    }
}

fn arrive_at_fence(shared: &Shared) {
    let mut state = shared.fence.lock().unwrap();
    let generation = state.generation;
    state.arrived += 1;
    if state.arrived == shared.nthreads {
        state.arrived = 0;
        state.generation += 1;
        shared.fence_cv.notify_all();
    } else {
        while state.generation == generation {
            state = shared.fence_cv.wait(state).unwrap();
        }
    }
}
