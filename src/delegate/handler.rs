use super::declare::{Declare, DeclaredType};
use super::returns::{Returned, Returns};
use crate::bounded::Slot;
use crate::http::HttpContext;
use crate::Error;

use std::any;
use std::marker::PhantomData;
use std::sync::Arc;

/// The values bound for one call, in parameter order.
pub struct Arguments {
    slots: std::vec::IntoIter<Option<Slot>>,
    index: usize,
}

impl Arguments {
    pub(crate) fn new(slots: Vec<Option<Slot>>) -> Self {
        Arguments {
            slots: slots.into_iter(),
            index: 0,
        }
    }

    /// Take the next argument.
    pub fn next<T: 'static>(&mut self) -> Result<T, Error> {
        let index = self.index;
        self.index += 1;

        self.slots
            .next()
            .flatten()
            .and_then(|slot| slot.downcast::<T>().ok())
            .map(|value| *value)
            .ok_or(Error::Argument {
                index,
                expected: any::type_name::<T>(),
            })
    }
}

/// A function that can be compiled into a request delegate.
///
/// Implemented for functions and closures of up to twelve parameters,
/// where every parameter implements [`Declare`] and the return type
/// implements [`Returns`].
pub trait Handler<Args>: Send + Sync + 'static {
    type Output: Returns;

    /// The declared type of every parameter.
    fn declare() -> Vec<DeclaredType>;

    fn call(&self, args: &mut Arguments) -> Result<Self::Output, Error>;
}

/// A function called on a target created for each request.
///
/// The first parameter is a reference to the target, the rest are
/// bound like the parameters of a [`Handler`].
pub trait Method<T, Args>: Send + Sync + 'static {
    type Output: Returns;

    fn declare() -> Vec<DeclaredType>;

    fn call(&self, target: &T, args: &mut Arguments) -> Result<Self::Output, Error>;
}

macro_rules! handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Returns,
            $($arg: Declare,)*
        {
            type Output = R;

            fn declare() -> Vec<DeclaredType> {
                vec![$(<$arg as Declare>::declare()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut Arguments) -> Result<R, Error> {
                $(let $arg = args.next::<$arg>()?;)*
                Ok(self($($arg),*))
            }
        }

        impl<F, T, R, $($arg,)*> Method<T, ($($arg,)*)> for F
        where
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
            T: 'static,
            R: Returns,
            $($arg: Declare,)*
        {
            type Output = R;

            fn declare() -> Vec<DeclaredType> {
                vec![$(<$arg as Declare>::declare()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, target: &T, args: &mut Arguments) -> Result<R, Error> {
                $(let $arg = args.next::<$arg>()?;)*
                Ok(self(target, $($arg),*))
            }
        }
    };
}

handler!();
handler!(A1);
handler!(A1, A2);
handler!(A1, A2, A3);
handler!(A1, A2, A3, A4);
handler!(A1, A2, A3, A4, A5);
handler!(A1, A2, A3, A4, A5, A6);
handler!(A1, A2, A3, A4, A5, A6, A7);
handler!(A1, A2, A3, A4, A5, A6, A7, A8);
handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

/// A handler with its argument types erased.
pub(crate) trait Invoke: Send + Sync {
    fn invoke(&self, cx: &HttpContext, args: Arguments) -> Result<Returned, Error>;
}

pub(crate) struct FnInvoker<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> FnInvoker<H, Args> {
    pub(crate) fn new(handler: H) -> Self {
        FnInvoker {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, Args> Invoke for FnInvoker<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn invoke(&self, _: &HttpContext, mut args: Arguments) -> Result<Returned, Error> {
        self.handler.call(&mut args).map(Returns::into_returned)
    }
}

pub(crate) type TargetFactory<T> = Arc<dyn Fn(&HttpContext) -> T + Send + Sync>;

pub(crate) struct MethodInvoker<H, T, Args> {
    handler: H,
    target: TargetFactory<T>,
    _args: PhantomData<fn() -> Args>,
}

impl<H, T, Args> MethodInvoker<H, T, Args> {
    pub(crate) fn new(handler: H, target: TargetFactory<T>) -> Self {
        MethodInvoker {
            handler,
            target,
            _args: PhantomData,
        }
    }
}

impl<H, T, Args> Invoke for MethodInvoker<H, T, Args>
where
    H: Method<T, Args>,
    T: 'static,
    Args: 'static,
{
    fn invoke(&self, cx: &HttpContext, mut args: Arguments) -> Result<Returned, Error> {
        let target = (self.target)(cx);
        self.handler.call(&target, &mut args).map(Returns::into_returned)
    }
}
