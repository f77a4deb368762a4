use thiserror::Error;

/// TetherError は呼び出し・昇格の失敗
///
/// ライフサイクル操作（構築・clone・drop）はエラーを返しません。
/// エラーになるのは `Functor::call`（とメンバ束縛の `ObjectPtr`）と `WeakPtr::try_lock` だけです。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TetherError {
    #[error("functor has no bound target")]
    EmptyFunctor,

    /// wrapper 自身のターゲットが実行中（ターゲットの中から同じ wrapper を呼んだ）
    #[error("functor target is already running (re-entrant call)")]
    ReentrantCall,

    /// `Rc<RefCell<T>>` で束縛したオブジェクトが、呼び出しと両立しない形で borrow 中
    #[error("bound object is already borrowed")]
    ObjectBusy,

    #[error("weak pointer has expired")]
    Expired,
}

pub type Result<T> = std::result::Result<T, TetherError>;
