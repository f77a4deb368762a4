use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use tether_core::functor::Functor;
use tether_core::impl_upcast;
use tether_core::shared::{SharedPtr, WeakPtr};
use tracing_subscriber::EnvFilter;

/// 文字列を 1 つ受け取る関数オブジェクト
struct FunctionalObject;

impl FunctionalObject {
    fn call(&mut self, arg: String) {
        println!("I'm functional object! My arg = {arg}");
    }
}

/// 2 引数の関数オブジェクト
struct FunctionalObject2;

impl FunctionalObject2 {
    fn call(&mut self, i: i32, d: f64) {
        println!("I'm functional object 2! My args: int = {i} double = {d}");
    }
}

fn hello() {
    println!("I am function pointer");
}

struct ClassMemberFunctions;

impl ClassMemberFunctions {
    fn fun1(&self) {
        println!("I'm class member function!");
    }

    fn fun2(&self, op1: f64, op2: f64) -> f64 {
        println!("I'm class member function! My args: op1 = {op1} op2 = {op2}");
        op1 + op2
    }
}

trait Resource {
    fn label(&self) -> &str;
}

struct FileHandle {
    path: String,
}

impl Resource for FileHandle {
    fn label(&self) -> &str {
        &self.path
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        println!("closing {}", self.path);
    }
}

impl_upcast!(FileHandle => dyn Resource);

fn replay_functors() -> Result<(), Box<dyn Error>> {
    let mut obj = FunctionalObject;
    let f: Functor<(String,), ()> = Functor::new(move |arg: String| obj.call(arg));
    f.call(("plobovikov".to_string(),))?;

    let mut obj2 = FunctionalObject2;
    let f2: Functor<(i32, f64), ()> = Functor::new(move |i: i32, d: f64| obj2.call(i, d));
    f2.call((1, 3.5))?;

    let f3: Functor<(), ()> = Functor::new(hello);
    f3.call(())?;

    let f4: Functor<(String,), String> = Functor::new(|arg: String| {
        println!("I am lambda expression! My arg = {arg}");
        arg
    });
    let echoed = f4.call(("plobovikov".to_string(),))?;
    tracing::debug!(%echoed, "lambda returned");

    let members = Rc::new(RefCell::new(ClassMemberFunctions));
    let f5: Functor<(), ()> = Functor::from_member(members.clone(), ClassMemberFunctions::fun1);
    f5.call(())?;

    let f6: Functor<(f64, f64), f64> = Functor::from_member(members, ClassMemberFunctions::fun2);
    println!("f6 call result: {}", f6.call((3.5, 6.5))?);

    let unbound: Functor<(), ()> = Functor::empty();
    if let Err(e) = unbound.call(()) {
        println!("empty functor: {e}");
    }
    Ok(())
}

fn walk_shared() -> Result<(), Box<dyn Error>> {
    let file = SharedPtr::new(FileHandle {
        path: "/tmp/tether.log".to_string(),
    });
    println!("created: {}", serde_json::to_string(&file.status())?);

    let resource: SharedPtr<dyn Resource> = file.upcast_ref();
    let weak: WeakPtr<dyn Resource> = resource.downgrade();
    println!("label via trait object: {}", resource.label());
    println!("after upcast + downgrade: {}", serde_json::to_string(&file.status())?);

    {
        let locked = weak.try_lock()?;
        println!("locked: {}", serde_json::to_string(&locked.status())?);
    }

    drop(file);
    drop(resource);
    println!("weak after last owner: {}", serde_json::to_string(&weak.status())?);

    match weak.try_lock() {
        Ok(_) => println!("unexpected: promotion succeeded"),
        Err(e) => println!("lock failed: {e}"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    replay_functors()?;
    walk_shared()?;
    Ok(())
}
