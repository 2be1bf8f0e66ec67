//! Actions: the typed request/response units routed by the engine.
//!
//! An action's concrete type is its dispatch key. Each action carries an
//! input that interceptors may rewrite before the handler runs, and an
//! output slot that the handler fills and later interceptors or filters may
//! rewrite on the way back out.

use std::any::{Any, type_name};

/// A typed request/response pair dispatched by the [`Engine`](crate::Engine).
///
/// Most actions are declared with [`action!`](crate::action), which supplies
/// the storage and this implementation.
pub trait Action: Any + Send {
    /// Value supplied by the caller.
    type Input: Send;
    /// Value produced by the handler.
    type Output: Clone + Send;

    /// Returns the input.
    fn input(&self) -> &Self::Input;

    /// Returns the input for in-place modification.
    fn input_mut(&mut self) -> &mut Self::Input;

    /// Returns the output, when one has been set.
    fn output(&self) -> Option<&Self::Output>;

    /// Replaces the output.
    fn set_output(&mut self, output: Self::Output);

    /// Removes and returns the output.
    fn take_output(&mut self) -> Option<Self::Output>;

    /// Replaces the input.
    fn set_input(&mut self, input: Self::Input) {
        *self.input_mut() = input;
    }
}

/// Object-safe view of an action whose concrete type is not known statically.
///
/// Filters apply to every action type and therefore receive this view. It is
/// implemented for every [`Action`].
pub trait DynAction: Send {
    /// Returns the concrete action type name.
    fn action_name(&self) -> &'static str;

    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to [`Any`] for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<A: Action> DynAction for A {
    fn action_name(&self) -> &'static str {
        type_name::<A>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn DynAction + '_ {
    /// Returns `true` when the action is an `A`.
    #[must_use]
    pub fn is<A: Action>(&self) -> bool {
        self.as_any().is::<A>()
    }

    /// Returns the action as an `A`, when it is one.
    #[must_use]
    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }

    /// Returns the action as a mutable `A`, when it is one.
    pub fn downcast_mut<A: Action>(&mut self) -> Option<&mut A> {
        self.as_any_mut().downcast_mut::<A>()
    }
}

/// Declares an [`Action`] type with an input and an optional output.
///
/// The generated struct has a `new(input)` constructor, an `into_output`
/// accessor, and implements [`Action`].
///
/// # Example
///
/// ```
/// use switchyard::{Action, action};
///
/// action! {
///     /// Greets someone by name.
///     pub struct Greet(String) -> String;
/// }
///
/// let mut greet = Greet::new(String::from("Ada"));
/// assert!(greet.output().is_none());
/// greet.set_output(format!("hello {}", greet.input()));
/// assert_eq!(greet.into_output().as_deref(), Some("hello Ada"));
/// ```
#[macro_export]
macro_rules! action {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($input:ty) -> $output:ty;
    ) => {
        $(#[$meta])*
        $vis struct $name {
            input: $input,
            output: ::core::option::Option<$output>,
        }

        impl $name {
            /// Creates the action with an empty output.
            #[must_use]
            $vis fn new(input: $input) -> Self {
                Self {
                    input,
                    output: ::core::option::Option::None,
                }
            }

            /// Consumes the action, returning its output.
            #[must_use]
            $vis fn into_output(self) -> ::core::option::Option<$output> {
                self.output
            }
        }

        impl $crate::Action for $name {
            type Input = $input;
            type Output = $output;

            fn input(&self) -> &Self::Input {
                &self.input
            }

            fn input_mut(&mut self) -> &mut Self::Input {
                &mut self.input
            }

            fn output(&self) -> ::core::option::Option<&Self::Output> {
                self.output.as_ref()
            }

            fn set_output(&mut self, output: Self::Output) {
                self.output = ::core::option::Option::Some(output);
            }

            fn take_output(&mut self) -> ::core::option::Option<Self::Output> {
                self.output.take()
            }
        }
    };
}
