//! 注入器使用示例
//!
//! 演示绑定、派生宏声明的注入点、提供者追踪更新和释放

use component_macros::Injectable;
use di_abstractions::{Injector, Instance, SupplierRef};
use infrastructure_common::Disposable;
use infrastructure_composition::{InjectorBuilder, InjectorImpl, LoggingConfig, MapObjectSupplier};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

// 示例：用户实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

// 示例：Repository trait
pub trait UserRepository: Send + Sync {
    fn find_by_id(&self, id: u64) -> Option<User>;
}

// 示例：模拟 Repository 实现
#[derive(Debug, Injectable)]
#[injectable(singleton, default)]
pub struct MockUserRepository {
    users: HashMap<u64, User>,
}

impl Default for MockUserRepository {
    fn default() -> Self {
        let mut users = HashMap::new();
        users.insert(
            1,
            User {
                id: 1,
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
        );
        users.insert(
            2,
            User {
                id: 2,
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            },
        );
        Self { users }
    }
}

impl UserRepository for MockUserRepository {
    fn find_by_id(&self, id: u64) -> Option<User> {
        self.users.get(&id).cloned()
    }
}

// 示例：模拟缓存服务，由注入器隐式构造
#[derive(Debug, Default, Injectable)]
#[injectable(singleton, creatable, default, disposable)]
pub struct MockCacheService {
    cache: Mutex<HashMap<String, String>>,
}

impl MockCacheService {
    fn get_user(&self, key: &str) -> Option<User> {
        self.cache
            .lock()
            .get(key)
            .and_then(|v| serde_json::from_str(v).ok())
    }

    fn set_user(&self, key: &str, user: &User) -> Result<(), serde_json::Error> {
        self.cache.lock().insert(key.to_string(), serde_json::to_string(user)?);
        Ok(())
    }
}

impl Disposable for MockCacheService {
    fn dispose(&mut self) {
        info!("缓存释放，丢弃 {} 条记录", self.cache.lock().len());
        self.cache.lock().clear();
    }
}

// 示例：用户服务
#[derive(Default, Injectable)]
#[injectable(default, post_construct = "start", pre_destroy = "stop")]
pub struct UserService {
    #[inject]
    repository: Option<Instance<dyn UserRepository>>,
    #[inject]
    cache: Option<Instance<MockCacheService>>,
    #[inject(named = "greeting", optional)]
    greeting: Option<String>,
}

impl UserService {
    fn start(&mut self) {
        info!("用户服务启动");
    }

    fn stop(&mut self) {
        info!("用户服务停止");
    }

    pub fn greet(&self, id: u64) -> Option<String> {
        let user = self.get_user(id)?;
        let greeting = self.greeting.as_deref().unwrap_or("Hello");
        Some(format!("{}, {}", greeting, user.name))
    }

    pub fn get_user(&self, id: u64) -> Option<User> {
        let cache = self.cache.as_ref()?;
        // 先尝试从缓存获取
        let cache_key = format!("user:{}", id);
        if let Some(user) = cache.read().get_user(&cache_key) {
            return Some(user);
        }

        let user = self.repository.as_ref()?.read().find_by_id(id)?;
        // 缓存结果
        let _ = cache.read().set_user(&cache_key, &user);
        Some(user)
    }
}

fn bind_repository(injector: &InjectorImpl) {
    let _ = injector
        .add_binding::<Instance<dyn UserRepository>>()
        .implemented_as::<MockUserRepository, Instance<dyn UserRepository>, _>(|repository| {
            repository as Instance<dyn UserRepository>
        });
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let injector = InjectorBuilder::new()
        .with_logging(LoggingConfig::development())
        .bind(bind_repository)
        .build()?;

    let context = MapObjectSupplier::new();
    let supplier: SupplierRef = context.clone();

    println!("=== 构造用户服务 ===");
    let service = injector.make::<UserService>(Some(&supplier), None)?;
    println!("{:?}", service.read().greet(1));

    println!("\n=== 提供者更新 ===");
    context.set_named("greeting", "Bonjour".to_string());
    println!("{:?}", service.read().greet(2));

    println!("\n=== 释放提供者 ===");
    context.dispose();
    println!("缓存命中: {:?}", service.read().get_user(1).map(|user| user.email));

    Ok(())
}
