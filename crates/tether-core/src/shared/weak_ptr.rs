//! WeakPtr - 所有しない観測ハンドル（weak）
//!
//! # 学習ポイント
//! - weak は値を生かさないが、control block は生かす
//! - 昇格（lock）は strong > 0 のときだけ成功する

use std::fmt;
use std::ptr::NonNull;

use super::control::{self, Header, Link};
use super::shared_ptr::SharedPtr;
use super::status::PtrStatus;
use super::upcast::Upcast;
use crate::error::{Result, TetherError};

/// WeakPtr は `SharedPtr` の所有状態を観測する
///
/// strong count を変えるのは `lock()` で昇格したときだけです。
///
/// # 使用例
/// ```
/// use tether_core::shared::SharedPtr;
///
/// let strong = SharedPtr::new(String::from("tether"));
/// let weak = strong.downgrade();
/// assert!(!weak.expired());
/// assert_eq!(weak.lock().as_str(), "tether");
///
/// drop(strong);
/// assert!(weak.expired());
/// assert!(weak.lock().is_empty());
/// ```
pub struct WeakPtr<T: ?Sized> {
    link: Option<Link<T>>,
}

impl<T: ?Sized> WeakPtr<T> {
    /// どこにも結び付いていない weak（常に expired）
    pub const fn new() -> Self {
        Self { link: None }
    }

    /// `link` の control block に weak を 1 つ追加して観測する
    pub(crate) fn from_link(link: Link<T>) -> Self {
        // SAFETY: 呼び出し側が strong か weak を持っているので block は生きている。
        unsafe { link.ctrl.as_ref() }.increment_weak();
        Self { link: Some(link) }
    }

    /// `shared` を観測し直す（strong count は変えない）
    pub fn assign<U>(&mut self, shared: &SharedPtr<U>)
    where
        U: ?Sized + Upcast<T>,
    {
        *self = shared.downgrade().upcast();
    }

    /// strong count が 0（または未結合）なら true
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// 観測している値の strong count（未結合なら 0）
    pub fn use_count(&self) -> usize {
        self.header().map_or(0, Header::strong)
    }

    /// 生きている `WeakPtr` の数（自分を含む、未結合なら 0）
    pub fn weak_count(&self) -> usize {
        self.header().map_or(0, Header::weak)
    }

    /// 昇格。生きていれば strong + 1 のハンドル、期限切れなら空のハンドル。
    pub fn lock(&self) -> SharedPtr<T> {
        match self.link {
            // SAFETY: weak を持っているので block は生きている。
            Some(link) if unsafe { link.ctrl.as_ref() }.try_increment_strong() => {
                SharedPtr::from_link(link)
            }
            _ => {
                tracing::trace!("lock on expired weak pointer");
                SharedPtr::empty()
            }
        }
    }

    /// `lock()` と同じだが、期限切れを `Expired` エラーで返す
    pub fn try_lock(&self) -> Result<SharedPtr<T>> {
        let strong = self.lock();
        if strong.is_empty() {
            tracing::debug!("weak pointer promotion failed");
            return Err(TetherError::Expired);
        }
        Ok(strong)
    }

    pub fn upcast<U>(mut self) -> WeakPtr<U>
    where
        U: ?Sized,
        T: Upcast<U>,
    {
        WeakPtr {
            link: self.link.take().map(|link| Link {
                ctrl: link.ctrl,
                value: <T as Upcast<U>>::upcast(link.value),
            }),
        }
    }

    /// 同じ control block を観測しているか
    pub fn same_owner<U: ?Sized>(&self, other: &SharedPtr<U>) -> bool {
        self.ctrl() == other.ctrl()
    }

    pub fn status(&self) -> PtrStatus {
        PtrStatus {
            use_count: self.use_count(),
            weak_count: self.weak_count(),
            expired: self.expired(),
        }
    }

    fn header(&self) -> Option<&Header> {
        // SAFETY: weak を持っている間、control block は生きている。
        self.link.map(|link| unsafe { &*link.ctrl.as_ptr() })
    }

    fn ctrl(&self) -> Option<NonNull<Header>> {
        self.link.map(|link| link.ctrl)
    }
}

impl<T: ?Sized> Clone for WeakPtr<T> {
    fn clone(&self) -> Self {
        match self.link {
            Some(link) => Self::from_link(link),
            None => Self::new(),
        }
    }
}

impl<T: ?Sized> Drop for WeakPtr<T> {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            // SAFETY: この weak は 1 つ分の weak count を持っている。
            unsafe { control::release_weak(link.ctrl) };
        }
    }
}

impl<T: ?Sized> Default for WeakPtr<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> From<&SharedPtr<T>> for WeakPtr<T> {
    fn from(shared: &SharedPtr<T>) -> Self {
        shared.downgrade()
    }
}

impl<T: ?Sized> fmt::Debug for WeakPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPtr")
            .field("use_count", &self.use_count())
            .field("expired", &self.expired())
            .finish()
    }
}
