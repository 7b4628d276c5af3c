//! Service doubles for failure-path tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use user_service_rpc::domain::{
    CreateCuidadorDto, CreateMedicoDto, CreatePacienteDto, CuidadorDto, DomainError, DomainResult,
    EntityService, InMemoryUserStore, MedicoDto, PacienteDto, ServiceProvider, ServiceScope,
};

/// Entity service whose every call either hangs or fails with a storage error
pub struct StubService<I, R> {
    hang: bool,
    _types: std::marker::PhantomData<fn(I) -> R>,
}

impl<I, R> StubService<I, R> {
    fn new(hang: bool) -> Self {
        Self {
            hang,
            _types: std::marker::PhantomData,
        }
    }

    async fn outcome<T>(&self) -> DomainResult<T> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(DomainError::storage("connection refused"))
    }
}

#[async_trait]
impl<I: Send + 'static, R: Send + 'static> EntityService for StubService<I, R> {
    type Input = I;
    type Record = R;

    async fn create(&self, _input: I) -> DomainResult<R> {
        self.outcome().await
    }

    async fn get_by_id(&self, _id: Uuid) -> DomainResult<Option<R>> {
        self.outcome().await
    }

    async fn get_all(&self) -> DomainResult<Vec<R>> {
        self.outcome().await
    }

    async fn update(&self, _id: Uuid, _input: I) -> DomainResult<Option<R>> {
        self.outcome().await
    }

    async fn delete(&self, _id: Uuid) -> DomainResult<bool> {
        self.outcome().await
    }
}

/// Scopes whose entity services hang (`hang = true`) or fail
pub struct StubProvider {
    hang: bool,
    store: InMemoryUserStore,
}

impl StubProvider {
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            hang: true,
            store: InMemoryUserStore::new(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            hang: false,
            store: InMemoryUserStore::new(),
        })
    }
}

impl ServiceProvider for StubProvider {
    fn create_scope(&self) -> ServiceScope {
        ServiceScope {
            pacientes: Arc::new(StubService::<CreatePacienteDto, PacienteDto>::new(self.hang)),
            medicos: Arc::new(StubService::<CreateMedicoDto, MedicoDto>::new(self.hang)),
            cuidadores: Arc::new(StubService::<CreateCuidadorDto, CuidadorDto>::new(self.hang)),
            usuarios: self.store.usuarios(),
        }
    }
}

/// Counts scopes handed out by an in-memory store
pub struct CountingProvider {
    pub store: InMemoryUserStore,
    pub scopes: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: InMemoryUserStore::new(),
            scopes: AtomicUsize::new(0),
        })
    }

    pub fn scopes(&self) -> usize {
        self.scopes.load(Ordering::SeqCst)
    }
}

impl ServiceProvider for CountingProvider {
    fn create_scope(&self) -> ServiceScope {
        self.scopes.fetch_add(1, Ordering::SeqCst);
        self.store.create_scope()
    }
}
