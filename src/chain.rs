//! Chain algorithms over any `std::error::Error`.
//!
//! A chain is an error followed by its successive [`Error::source`] links.
//! Everything here works through that one capability, so foreign error types
//! participate without knowing about [`AppError`].
//!
//! # Absent Errors
//!
//! Where an error may be absent, the functions take `Option` and map `None`
//! to `None` (or `false`), so callers never need to guard:
//!
//! ```rust
//! use service_errors::{join, wrap, BoxError};
//!
//! assert!(wrap(None::<BoxError>, "ignored").is_none());
//! assert!(join([None::<BoxError>, None]).is_none());
//! ```
//!
//! # Cycles
//!
//! `source()` chains are expected to be acyclic. Traversal is nonetheless
//! bounded by [`MAX_CHAIN_DEPTH`] links: a walk that reaches the bound stops
//! there, returns what it reached, and emits a `tracing` warning. A cyclic
//! chain is a bug in the error type that built it, and the warning is how
//! it surfaces.

use crate::{AppError, AsDynError, BoxError, Code, resolve_app_error};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::result;

/// Maximum number of links any traversal visits.
pub const MAX_CHAIN_DEPTH: usize = 1024;

fn warn_depth_exceeded() {
    tracing::warn!(
        max_depth = MAX_CHAIN_DEPTH,
        "error chain exceeded maximum depth; traversal stopped (cyclic source chain?)"
    );
}

// ============================================================================
// Wrapping
// ============================================================================

/// Context message layered over a cause.
///
/// Displays as `"{message}: {cause}"`; `source()` returns the cause.
#[derive(Debug)]
pub struct WrapError {
    message: Cow<'static, str>,
    cause: BoxError,
}

impl WrapError {
    /// Layer `message` over `cause`.
    pub fn new(cause: impl Into<BoxError>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            cause: cause.into(),
        }
    }

    /// The context message alone.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped error.
    #[inline]
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Unwrap into the cause.
    #[inline]
    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

impl fmt::Display for WrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.cause)
    }
}

impl Error for WrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Wrap `err` with a context message. `None` stays `None`.
pub fn wrap<E: Into<BoxError>>(
    err: Option<E>,
    message: impl Into<Cow<'static, str>>,
) -> Option<WrapError> {
    err.map(|e| WrapError::new(e, message))
}

/// Context for the error side of a `Result`.
pub trait ResultExt<T> {
    /// Wrap the error with a fixed message.
    fn wrap_err(self, message: impl Into<Cow<'static, str>>) -> result::Result<T, WrapError>;

    /// Wrap the error with a message computed only on failure.
    fn wrap_err_with<M, F>(self, f: F) -> result::Result<T, WrapError>
    where
        M: Into<Cow<'static, str>>,
        F: FnOnce() -> M;
}

impl<T, E: Into<BoxError>> ResultExt<T> for result::Result<T, E> {
    fn wrap_err(self, message: impl Into<Cow<'static, str>>) -> result::Result<T, WrapError> {
        self.map_err(|e| WrapError::new(e, message))
    }

    fn wrap_err_with<M, F>(self, f: F) -> result::Result<T, WrapError>
    where
        M: Into<Cow<'static, str>>,
        F: FnOnce() -> M,
    {
        self.map_err(|e| WrapError::new(e, f()))
    }
}

// ============================================================================
// Joining
// ============================================================================

/// Several independent errors reported together.
///
/// Displays one constituent per line. `source()` is `None`; [`is`] and
/// [`find`] search every constituent instead.
#[derive(Debug)]
pub struct MultiError {
    errors: SmallVec<[BoxError; 4]>,
}

impl MultiError {
    /// The constituents, in join order.
    #[inline]
    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    /// Number of constituents.
    #[inline]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false for a value produced by [`join`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate constituents as plain trait objects.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        self.errors.iter().map(|e| e.as_ref() as &(dyn Error + 'static))
    }

    /// Take the constituents back.
    pub fn into_errors(self) -> Vec<BoxError> {
        self.errors.into_vec()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl Error for MultiError {}

/// Join errors, skipping absent ones.
///
/// - nothing left: `None`
/// - exactly one left: that same box, so its concrete type still matches
/// - otherwise: a [`MultiError`]
pub fn join<I>(errs: I) -> Option<BoxError>
where
    I: IntoIterator,
    I::Item: Into<Option<BoxError>>,
{
    let mut errors: SmallVec<[BoxError; 4]> =
        errs.into_iter().filter_map(|e| e.into()).collect();
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => Some(Box::new(MultiError { errors })),
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Iterator over an error and its sources. Created by [`chain`].
#[derive(Clone)]
pub struct Chain<'a> {
    next: Option<&'a (dyn Error + 'static)>,
    remaining: usize,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if self.remaining == 0 {
            warn_depth_exceeded();
            return None;
        }
        self.remaining -= 1;
        self.next = current.source();
        Some(current)
    }
}

/// Iterate `err` and each successive source, at most [`MAX_CHAIN_DEPTH`]
/// links.
pub fn chain<E: AsDynError + ?Sized>(err: &E) -> Chain<'_> {
    Chain {
        next: Some(err.as_dyn_error()),
        remaining: MAX_CHAIN_DEPTH,
    }
}

/// The deepest link reachable from `err`; `err` itself when it has no source.
pub fn root_cause<E: AsDynError + ?Sized>(err: &E) -> &(dyn Error + 'static) {
    let first = err.as_dyn_error();
    chain(first).last().unwrap_or(first)
}

/// Depth-first search over the chain, fanning out into [`MultiError`]
/// constituents. `budget` caps the total links visited.
fn search<'a, R, F>(err: &'a (dyn Error + 'static), budget: &mut usize, f: &mut F) -> Option<R>
where
    F: FnMut(&'a (dyn Error + 'static)) -> Option<R>,
{
    let mut current = Some(err);
    while let Some(link) = current {
        if *budget == 0 {
            warn_depth_exceeded();
            return None;
        }
        *budget -= 1;

        if let Some(found) = f(link) {
            return Some(found);
        }
        if let Some(multi) = link.downcast_ref::<MultiError>() {
            for inner in multi.iter() {
                if let Some(found) = search(inner, budget, f) {
                    return Some(found);
                }
            }
            return None;
        }
        current = link.source();
    }
    None
}

/// Run `f` over every link reachable from `err` (including joined
/// constituents) until it returns `Some`.
pub(crate) fn search_chain<'a, R, E, F>(err: &'a E, mut f: F) -> Option<R>
where
    E: AsDynError + ?Sized,
    F: FnMut(&'a (dyn Error + 'static)) -> Option<R>,
{
    let mut budget = MAX_CHAIN_DEPTH;
    search(err.as_dyn_error(), &mut budget, &mut f)
}

/// Identity of two links.
///
/// The same object, or two links that resolve to the same `AppError` (a
/// sentinel placed in a chain by reference resolves to the sentinel itself).
/// Zero-sized values share one dangling address per alignment, so they
/// never match by address; use [`is_match`] for those.
fn same_error(link: &(dyn Error + 'static), target: &(dyn Error + 'static)) -> bool {
    let sized = size_of_val(link) != 0 && size_of_val(target) != 0;
    if sized && std::ptr::addr_eq(link as *const dyn Error, target as *const dyn Error) {
        return true;
    }
    match (resolve_app_error(link), resolve_app_error(target)) {
        (Some(a), Some(b)) => std::ptr::eq(a, b),
        _ => false,
    }
}

/// Whether any link in `err`'s chain is `target`.
///
/// Matching is by identity, which is what makes sentinels useful:
///
/// ```rust
/// use service_errors::{is, join, sentinels, wrap, BoxError};
///
/// let err = wrap(Some(&sentinels::NOT_FOUND), "load invoice").unwrap();
/// assert!(is(&err, &sentinels::NOT_FOUND));
/// assert!(!is(&err, &sentinels::CONFLICT));
///
/// let both = join([
///     BoxError::from(&sentinels::NOT_FOUND),
///     BoxError::from(&sentinels::INVALID_INPUT),
/// ])
/// .unwrap();
/// assert!(is(&*both, &sentinels::NOT_FOUND));
/// assert!(is(&*both, &sentinels::INVALID_INPUT));
/// ```
pub fn is<E, T>(err: &E, target: &T) -> bool
where
    E: AsDynError + ?Sized,
    T: AsDynError + ?Sized,
{
    let target = target.as_dyn_error();
    search_chain(err, |link| same_error(link, target).then_some(())).is_some()
}

/// Whether any link in `err`'s chain satisfies `pred`.
///
/// The value-based counterpart of [`is`], for errors without a stable
/// identity: an `io::Error` of a given kind, a unit-struct error type, a
/// status code carried by a client error.
///
/// ```rust
/// use service_errors::{is_match, wrap};
/// use std::io;
///
/// let err = wrap(Some(io::Error::from(io::ErrorKind::TimedOut)), "dial db").unwrap();
/// assert!(is_match(&err, |link| {
///     link.downcast_ref::<io::Error>()
///         .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut)
/// }));
/// ```
pub fn is_match<E, P>(err: &E, mut pred: P) -> bool
where
    E: AsDynError + ?Sized,
    P: FnMut(&(dyn Error + 'static)) -> bool,
{
    search_chain(err, |link| pred(link).then_some(())).is_some()
}

/// The first link of concrete type `T`.
pub fn find<'a, T, E>(err: &'a E) -> Option<&'a T>
where
    T: Error + 'static,
    E: AsDynError + ?Sized,
{
    search_chain(err, |link| link.downcast_ref::<T>())
}

/// The first link that resolves to an [`AppError`], including variants and
/// sentinels.
pub fn find_app_error<E: AsDynError + ?Sized>(err: &E) -> Option<&AppError> {
    search_chain(err, resolve_app_error)
}

/// Whether any classified link carries `code`.
pub fn has_code<E: AsDynError + ?Sized>(err: &E, code: &Code) -> bool {
    search_chain(err, |link| {
        resolve_app_error(link).filter(|app| app.code() == code)
    })
    .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldError, Kind, sentinels};
    use std::io;

    fn base() -> BoxError {
        Box::new(AppError::new(Code::Internal, "base", "base"))
    }

    fn addr(err: &(dyn Error + 'static)) -> *const () {
        err as *const dyn Error as *const ()
    }

    #[test]
    fn wrap_none_is_none() {
        assert!(wrap(None::<io::Error>, "x").is_none());
    }

    #[test]
    fn wrap_formats_message_and_keeps_cause() {
        let inner = base();
        let inner_addr = addr(inner.as_ref());
        let wrapped = wrap(Some(inner), "wrapped context").unwrap();
        assert_eq!(wrapped.to_string(), "wrapped context: base");
        assert_eq!(wrapped.message(), "wrapped context");
        let source = wrapped.source().unwrap();
        assert_eq!(addr(source), inner_addr);
    }

    #[test]
    fn root_cause_of_two_level_wrap_is_base() {
        let inner = base();
        let inner_addr = addr(inner.as_ref());
        let outer = wrap(wrap(Some(inner), "mid"), "outer").unwrap();
        assert_eq!(addr(root_cause(&outer)), inner_addr);
    }

    #[test]
    fn root_cause_without_source_is_input() {
        let err = AppError::new(Code::Validation, "innermost", "");
        assert_eq!(addr(root_cause(&err)), addr(&err));
    }

    #[test]
    fn is_matches_sentinel_through_wraps() {
        let err = wrap(wrap(Some(&sentinels::NOT_FOUND), "ctx"), "more ctx").unwrap();
        assert!(is(&err, &sentinels::NOT_FOUND));
        assert!(!is(&err, &sentinels::INTERNAL));
    }

    #[test]
    fn is_matches_sentinel_as_app_error_cause() {
        let err = AppError::new(Code::Internal, "lookup failed", "")
            .with_cause(&sentinels::NOT_FOUND);
        assert!(is(&err, &sentinels::NOT_FOUND));
    }

    #[test]
    fn is_distinguishes_equal_looking_errors() {
        let a = AppError::new(Code::NotFound, "same", "same");
        let b = AppError::new(Code::NotFound, "same", "same");
        assert!(is(&a, &a));
        assert!(!is(&a, &b));
    }

    #[derive(Debug)]
    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("missing")
        }
    }

    impl Error for Missing {}

    #[derive(Debug)]
    struct Banned;

    impl fmt::Display for Banned {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("banned")
        }
    }

    impl Error for Banned {}

    #[test]
    fn is_never_matches_unrelated_zero_sized_errors() {
        let banned: BoxError = Box::new(Banned);
        let wrapped = wrap(Some(Missing), "lookup").unwrap();
        assert!(!is(&wrapped, &*banned));

        let joined = join([BoxError::from(Missing), BoxError::from(io::Error::other("io"))]).unwrap();
        assert!(!is(&*joined, &*banned));
        assert!(!is(&*joined, &Missing));
    }

    #[test]
    fn is_match_finds_value_equal_links() {
        let timed_out = |link: &(dyn Error + 'static)| {
            link.downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut)
        };
        let err = wrap(wrap(Some(io::Error::from(io::ErrorKind::TimedOut)), "dial"), "load").unwrap();
        assert!(is_match(&err, timed_out));

        let joined = join([
            BoxError::from(FieldError::new("email", "missing @")),
            BoxError::from(wrap(Some(io::Error::from(io::ErrorKind::TimedOut)), "cache").unwrap()),
        ])
        .unwrap();
        assert!(is_match(&*joined, timed_out));
        assert!(is_match(&*joined, |link| link.is::<FieldError>()));

        let refused = wrap(Some(io::Error::from(io::ErrorKind::ConnectionRefused)), "dial").unwrap();
        assert!(!is_match(&refused, timed_out));
        assert!(is_match(&wrap(Some(Missing), "x").unwrap(), |link| link.is::<Missing>()));
        assert!(!is_match(&wrap(Some(Missing), "x").unwrap(), |link| link.is::<Banned>()));
    }

    #[test]
    fn join_drops_absent_errors() {
        assert!(join(Vec::<BoxError>::new()).is_none());
        assert!(join([None::<BoxError>, None]).is_none());
    }

    #[test]
    fn join_single_returns_same_box() {
        let only = base();
        let only_addr = addr(only.as_ref());
        let joined = join([None, Some(only), None]).unwrap();
        assert_eq!(addr(joined.as_ref()), only_addr);
        assert!(joined.downcast_ref::<AppError>().is_some());
    }

    #[test]
    fn join_many_matches_each_constituent() {
        let merged = join([
            BoxError::from(&sentinels::NOT_FOUND),
            BoxError::from(&sentinels::INVALID_INPUT),
        ])
        .unwrap();
        assert!(is(&*merged, &sentinels::NOT_FOUND));
        assert!(is(&*merged, &sentinels::INVALID_INPUT));
        assert!(!is(&*merged, &sentinels::TIMEOUT));

        let multi = merged.downcast_ref::<MultiError>().unwrap();
        assert_eq!(multi.len(), 2);
        assert_eq!(merged.to_string(), "resource not found\ninvalid input");
    }

    #[test]
    fn find_reaches_into_joined_chains() {
        let field: BoxError = Box::new(FieldError::new("email", "missing @"));
        let wrapped = wrap(Some(field), "signup").unwrap();
        let merged = join([BoxError::from(io::Error::other("disk")), BoxError::from(wrapped)]).unwrap();

        let found = find::<FieldError, _>(&*merged).unwrap();
        assert_eq!(found.field(), "email");
        assert!(find::<io::Error, _>(&*merged).is_some());
    }

    #[test]
    fn find_app_error_resolves_variants_and_sentinels() {
        let err = wrap(Some(&sentinels::RATE_LIMITED), "ctx").unwrap();
        assert_eq!(find_app_error(&err).map(|e| e.kind()), Some(&Kind::RateLimit));

        let foreign = wrap(Some(io::Error::other("x")), "ctx").unwrap();
        assert!(find_app_error(&foreign).is_none());
    }

    #[test]
    fn has_code_checks_every_link() {
        let err = AppError::new(Code::Internal, "outer", "")
            .with_cause(AppError::new(Code::Conflict, "inner", ""));
        assert!(has_code(&err, &Code::Internal));
        assert!(has_code(&err, &Code::Conflict));
        assert!(!has_code(&err, &Code::NotFound));
    }

    #[test]
    fn result_ext_wraps_error_side() {
        let failed: result::Result<(), io::Error> = Err(io::Error::other("refused"));
        let err = failed.wrap_err("connect to cache").unwrap_err();
        assert_eq!(err.to_string(), "connect to cache: refused");

        let ok: result::Result<u8, io::Error> = Ok(1);
        let mut called = false;
        let value = ok
            .wrap_err_with(|| {
                called = true;
                "never"
            })
            .unwrap();
        assert_eq!(value, 1);
        assert!(!called);
    }

    #[test]
    fn chain_yields_each_link_in_order() {
        let err = wrap(Some(AppError::new(Code::Internal, "root", "")), "top").unwrap();
        let texts: Vec<String> = chain(&err).map(|e| e.to_string()).collect();
        assert_eq!(texts, vec!["top: root".to_owned(), "root".to_owned()]);
    }

    #[derive(Debug)]
    struct Ouroboros;

    impl fmt::Display for Ouroboros {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ouroboros")
        }
    }

    impl Error for Ouroboros {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self)
        }
    }

    #[test]
    fn cyclic_chain_traversal_is_bounded() {
        let err = Ouroboros;
        assert_eq!(chain(&err).count(), MAX_CHAIN_DEPTH);
        assert_eq!(root_cause(&err).to_string(), "ouroboros");
        assert!(!is(&err, &sentinels::NOT_FOUND));
        assert!(!has_code(&err, &Code::Internal));
    }
}
