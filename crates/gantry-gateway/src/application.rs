use crate::environ::Environ;
use crate::error::AppError;
use crate::start_response::StartResponse;
use crate::value::Value;

/// A gateway application.
///
/// Called once per request with the request metadata and the status
/// callback. Must report a status through `start_response`, either before
/// returning or while the first chunk of a lazy body is pulled.
pub trait Application: Send + Sync {
    fn call(&self, environ: &Environ, start_response: &mut StartResponse<'_>)
    -> Result<Value, AppError>;
}

impl<F> Application for F
where
    F: Fn(&Environ, &mut StartResponse<'_>) -> Result<Value, AppError> + Send + Sync,
{
    fn call(
        &self,
        environ: &Environ,
        start_response: &mut StartResponse<'_>,
    ) -> Result<Value, AppError> {
        self(environ, start_response)
    }
}

/// Pin a closure to the application signature.
///
/// Closures passed through a generic bound do not get their argument
/// lifetimes inferred as higher-ranked; this does it for them.
pub fn app_fn<F>(f: F) -> F
where
    F: Fn(&Environ, &mut StartResponse<'_>) -> Result<Value, AppError> + Send + Sync,
{
    f
}
