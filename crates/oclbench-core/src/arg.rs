//! Kernel argument collaborator seam.

use crate::device::Device;
use crate::error::Result;

/// A kernel argument owned by the caller.
///
/// The executor never looks inside an argument; it only moves data with
/// [`upload`](KernelArg::upload) and [`download`](KernelArg::download),
/// resets it with [`clear`](KernelArg::clear), and attaches it to a
/// compiled kernel with [`bind`](KernelArg::bind). Every method must be
/// safe to call any number of times.
pub trait KernelArg<D: Device> {
    /// Host to device. May allocate device memory on first call.
    fn upload(&mut self, device: &D) -> Result<()>;

    /// Device to host.
    fn download(&mut self, device: &D) -> Result<()>;

    /// Reset to the pre-upload state. Idempotent.
    fn clear(&mut self);

    /// Set this argument as parameter `index` of `kernel`.
    ///
    /// Binding may reference device memory populated by `upload`, so
    /// callers upload first.
    fn bind(&self, kernel: &D::Kernel, index: u32) -> Result<()>;
}

/// Argument list handed to the executor, in kernel parameter order.
pub type ArgList<'a, D> = [&'a mut dyn KernelArg<D>];

pub(crate) fn upload_all<D: Device>(device: &D, args: &mut ArgList<'_, D>) -> Result<()> {
    for (i, arg) in args.iter_mut().enumerate() {
        arg.upload(device).map_err(|e| e.for_argument(i, "upload"))?;
    }
    Ok(())
}

pub(crate) fn bind_all<D: Device>(kernel: &D::Kernel, args: &ArgList<'_, D>) -> Result<()> {
    for (i, arg) in args.iter().enumerate() {
        arg.bind(kernel, i as u32)
            .map_err(|e| e.for_argument(i, "bind"))?;
    }
    Ok(())
}

/// Upload then bind each argument in turn.
pub(crate) fn upload_and_bind_all<D: Device>(
    device: &D,
    kernel: &D::Kernel,
    args: &mut ArgList<'_, D>,
) -> Result<()> {
    for (i, arg) in args.iter_mut().enumerate() {
        arg.upload(device).map_err(|e| e.for_argument(i, "upload"))?;
        arg.bind(kernel, i as u32)
            .map_err(|e| e.for_argument(i, "bind"))?;
    }
    Ok(())
}

pub(crate) fn download_all<D: Device>(device: &D, args: &mut ArgList<'_, D>) -> Result<()> {
    for (i, arg) in args.iter_mut().enumerate() {
        arg.download(device)
            .map_err(|e| e.for_argument(i, "download"))?;
    }
    Ok(())
}

pub(crate) fn clear_all<D: Device>(args: &mut ArgList<'_, D>) {
    for arg in args.iter_mut() {
        arg.clear();
    }
}
