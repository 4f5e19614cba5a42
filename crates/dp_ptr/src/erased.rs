use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Common methods

macro_rules! impl_erased_ptr {
    ($ptr:ident) => {
        impl From<$ptr<'_>> for NonNull<u8> {
            #[inline(always)]
            fn from(ptr: $ptr<'_>) -> Self {
                ptr.0
            }
        }

        impl $ptr<'_> {
            /// Check if the pointer is aligned to type `T`.
            #[inline]
            pub fn is_aligned<T>(&self) -> bool {
                self.0.as_ptr().cast::<T>().is_aligned()
            }

            /// Alignment check that only runs in debug mode.
            #[cfg_attr(debug_assertions, track_caller)]
            #[cfg_attr(not(debug_assertions), inline(always))]
            pub fn debug_assert_aligned<T>(&self) {
                debug_assert!(
                    self.is_aligned::<T>(),
                    "pointer is not aligned. Address {:p} does not have alignment {} for type {}",
                    self.0,
                    align_of::<T>(),
                    core::any::type_name::<T>(),
                );
            }

            /// Advance the pointer by `count` bytes.
            ///
            /// The pointer is type-erased, so `count` is always in raw bytes.
            ///
            /// # Safety
            /// - The result must stay inside the same allocated object.
            /// - The resulting pointer must outlive the lifetime of this pointer.
            #[inline]
            pub const unsafe fn byte_add(self, count: usize) -> Self {
                Self(
                    // SAFETY: The caller upholds safety for `add` and ensures the result is not null.
                    unsafe { self.0.add(count) },
                    PhantomData,
                )
            }
        }

        impl fmt::Pointer for $ptr<'_> {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Pointer::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $ptr<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($ptr), self.0)
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Ptr

/// A fully type-erased shared pointer, similar to `&'a dyn Any` but thin.
///
/// # borrow-like
///
/// - It must always point to a valid value of whatever the pointee type is.
/// - The lifetime `'a` accurately represents how long the pointer is valid for.
///
/// # immutable
///
/// Its target must not be changed while this pointer is alive. The borrow
/// checker usually guarantees this through the attached lifetime.
///
/// # Examples
///
/// ```
/// # use dp_ptr::Ptr;
/// let x = 8i32;
/// let ptr = Ptr::from_ref(&x);
///
/// ptr.debug_assert_aligned::<i32>();
/// let rx = unsafe { ptr.as_ref::<i32>() };
/// assert_eq!(*rx, 8);
/// ```
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Ptr<'a>(NonNull<u8>, PhantomData<&'a u8>);

impl_erased_ptr!(Ptr);

impl<'a> Ptr<'a> {
    /// Create a `Ptr` from a raw `NonNull<u8>` pointer.
    ///
    /// # Safety
    ///
    /// - The provided lifetime `'a` must be valid for the pointee.
    /// - `ptr` must point to a valid object of the intended pointee type.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<u8>) -> Ptr<'a> {
        Ptr(ptr, PhantomData)
    }

    /// Creates a `Ptr` from a reference with the same lifetime.
    ///
    /// For wide references (`&dyn Any`, `&[T]`) only the data pointer is kept.
    #[inline(always)]
    pub const fn from_ref<T: ?Sized>(val: &'a T) -> Ptr<'a> {
        Ptr(NonNull::from_ref(val).cast(), PhantomData)
    }

    /// Gets the underlying pointer, erasing the associated lifetime.
    #[inline(always)]
    pub const fn as_ptr(self) -> *const u8 {
        self.0.as_ptr()
    }

    /// Convert this [`Ptr`] into a `&T` with the same lifetime `'a`.
    ///
    /// # Safety
    ///
    /// - `T` must match the actual type of the pointee.
    /// - The pointer must be properly aligned for `T`.
    ///
    /// Consider [`debug_assert_aligned`](Self::debug_assert_aligned) before
    /// calling.
    #[inline(always)]
    pub const unsafe fn as_ref<T>(self) -> &'a T {
        // SAFETY: Type correct, ptr aligned and pointee valid object.
        unsafe { &*self.0.as_ptr().cast::<T>() }
    }
}

impl<'a, T: ?Sized> From<&'a T> for Ptr<'a> {
    #[inline]
    fn from(val: &'a T) -> Self {
        Self::from_ref(val)
    }
}

// -----------------------------------------------------------------------------
// PtrMut

/// A fully type-erased exclusive pointer, similar to `&'a mut dyn Any` but thin.
///
/// # borrow-like
///
/// - It must always point to a valid value of whatever the pointee type is.
/// - The lifetime `'a` accurately represents how long the pointer is valid for.
///
/// # mutable and exclusive
///
/// It cannot be cloned, and the caller must comply with Rust aliasing rules.
///
/// # Examples
///
/// ```
/// # use dp_ptr::PtrMut;
/// let mut x = 8i32;
/// let mut ptr = PtrMut::from_mut(&mut x);
///
/// ptr.debug_assert_aligned::<i32>();
/// let rx = unsafe { ptr.as_mut::<i32>() };
/// *rx += 2;
/// assert_eq!(*rx, 10);
/// ```
#[repr(transparent)]
pub struct PtrMut<'a>(NonNull<u8>, PhantomData<&'a u8>);

impl_erased_ptr!(PtrMut);

impl<'a> PtrMut<'a> {
    /// Create a `PtrMut` from a raw `NonNull<u8>` pointer.
    ///
    /// # Safety
    ///
    /// - The data pointed to by `ptr` must be valid for writes.
    /// - The provided lifetime `'a` must be valid for the pointee.
    /// - `ptr` must point to a valid object of the intended pointee type.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<u8>) -> PtrMut<'a> {
        PtrMut(ptr, PhantomData)
    }

    /// Creates a `PtrMut` from a mutable reference with the same lifetime.
    ///
    /// For wide references only the data pointer is kept.
    #[inline(always)]
    pub const fn from_mut<T: ?Sized>(val: &'a mut T) -> PtrMut<'a> {
        PtrMut(NonNull::from_mut(val).cast(), PhantomData)
    }

    /// Gets the underlying pointer, erasing the associated lifetime.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Get a `&T` from this [`PtrMut`] with the **smaller** lifetime.
    ///
    /// The lifetime follows `&self`, not the erased `'a`, so the borrow checker
    /// keeps this `PtrMut` unusable while the reference is active.
    ///
    /// # Safety
    /// - `T` must match the actual type of the pointee.
    /// - The pointer must be properly aligned for `T`.
    #[inline(always)]
    pub const unsafe fn as_ref<T>(&self) -> &'_ T {
        // '_ instead of 'a
        // SAFETY: Type correct, ptr aligned and pointee valid object.
        unsafe { &*self.0.as_ptr().cast::<T>() }
    }

    /// Get a `&mut T` from this [`PtrMut`] with the **smaller** lifetime.
    ///
    /// The lifetime follows `&mut self`, not the erased `'a`, so the borrow
    /// checker keeps this `PtrMut` unusable while the reference is active.
    ///
    /// # Safety
    /// - `T` must match the actual type of the pointee.
    /// - The pointer must be properly aligned for `T`.
    #[inline(always)]
    pub const unsafe fn as_mut<T>(&mut self) -> &'_ mut T {
        // '_ instead of 'a
        // SAFETY: Type correct, ptr aligned and pointee valid object.
        unsafe { &mut *self.0.as_ptr().cast::<T>() }
    }

    /// Gets a [`Ptr`] from self with a **smaller** lifetime.
    #[inline(always)]
    pub const fn borrow(&self) -> Ptr<'_> {
        // '_ instead of 'a
        // SAFETY: the pointer stays valid for the borrowed lifetime.
        unsafe { Ptr::new(self.0) }
    }

    /// Gets a [`PtrMut`] from self with a **smaller** lifetime.
    ///
    /// The pointer itself needs to be mutable, so the borrow checker can keep
    /// the old pointer unusable while the reborrow is active.
    pub const fn reborrow(&mut self) -> PtrMut<'_> {
        // '_ instead of 'a
        PtrMut(self.0, PhantomData)
    }

    /// Convert this [`PtrMut`] into a `&mut T` with the **same** lifetime.
    ///
    /// # Safety
    /// - `T` must match the actual type of the pointee.
    /// - The pointer must be properly aligned for `T`.
    #[inline(always)]
    pub const unsafe fn consume<T>(self) -> &'a mut T {
        // SAFETY: Type correct, ptr aligned and pointee valid object.
        unsafe { &mut *self.0.as_ptr().cast::<T>() }
    }
}

impl<'a, T: ?Sized> From<&'a mut T> for PtrMut<'a> {
    #[inline]
    fn from(val: &'a mut T) -> Self {
        Self::from_mut(val)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ptr_roundtrip() {
        let x = 41i64;
        let ptr = Ptr::from_ref(&x);
        ptr.debug_assert_aligned::<i64>();
        assert_eq!(unsafe { *ptr.as_ref::<i64>() }, 41);
    }

    #[test]
    fn ptr_mut_write() {
        let mut x = 1u32;
        let mut ptr = PtrMut::from_mut(&mut x);
        *unsafe { ptr.as_mut::<u32>() } = 7;
        assert_eq!(x, 7);
    }

    #[test]
    fn byte_add_reaches_field() {
        #[repr(C)]
        struct Pair {
            a: u16,
            b: u16,
        }
        let pair = Pair { a: 1, b: 2 };
        let ptr = Ptr::from_ref(&pair);
        let b = unsafe { ptr.byte_add(core::mem::offset_of!(Pair, b)) };
        assert_eq!(unsafe { *b.as_ref::<u16>() }, 2);
    }

    #[test]
    fn erases_wide_pointers() {
        use core::any::Any;
        let x = 3i32;
        let wide: &dyn Any = &x;
        let ptr = Ptr::from_ref(wide);
        assert_eq!(unsafe { *ptr.as_ref::<i32>() }, 3);
    }
}
