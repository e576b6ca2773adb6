use std::ffi::c_void;

use regex::Regex;
use windows::Win32::Foundation::{HWND, LPARAM, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BitBlt, ClientToScreen, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject,
    GetDIBits, GetWindowDC, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, HBITMAP, HDC, SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    mouse_event, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetSystemMetrics, GetWindowRect, GetWindowTextW, IsWindow,
    IsWindowVisible, SendMessageW, SetCursorPos, SetForegroundWindow, ShowWindow, SM_CXSCREEN,
    SM_CYSCREEN, SW_RESTORE, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE,
};

use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;
use super::{MouseMessage, Platform, RawCapture, WindowBackend};

const MK_LBUTTON: usize = 0x0001;

pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> windows::Win32::Foundation::BOOL {
    let list = &mut *(lparam.0 as *mut Vec<(WindowId, String)>);
    if IsWindowVisible(hwnd).as_bool() {
        let mut buf = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut buf);
        if len > 0 {
            let title = String::from_utf16_lossy(&buf[..len as usize]);
            list.push((hwnd.0 as usize as u64, title));
        }
    }
    true.into()
}

impl Platform for WindowsPlatform {
    fn find_windows(&self, pattern: &str) -> Vec<(WindowId, String)> {
        let mut all: Vec<(WindowId, String)> = Vec::new();
        unsafe {
            let _ = EnumWindows(Some(enum_proc), LPARAM(&mut all as *mut _ as isize));
        }
        match Regex::new(pattern) {
            Ok(re) => all.into_iter().filter(|(_, t)| re.is_match(t)).collect(),
            Err(e) => {
                logger::error(&format!("bad window pattern \"{}\": {}", pattern, e));
                Vec::new()
            }
        }
    }

    fn open(&self, window_id: WindowId) -> Box<dyn WindowBackend> {
        Box::new(WindowsWindow {
            window_id,
            surface: None,
        })
    }
}

/// Persistent blit surface for full-frame captures.
struct BlitSurface {
    win_dc: HDC,
    mem_dc: HDC,
    bitmap: HBITMAP,
    w: i32,
    h: i32,
}

pub struct WindowsWindow {
    window_id: WindowId,
    surface: Option<BlitSurface>,
}

// Raw GDI handles; only ever touched from the owning worker thread.
unsafe impl Send for WindowsWindow {}

impl WindowsWindow {
    fn hwnd(&self) -> HWND {
        HWND(self.window_id as usize as *mut c_void)
    }

    fn query_geometry(&self) -> Result<WindowGeometry, CaptureError> {
        unsafe {
            let hwnd = self.hwnd();
            if !IsWindow(hwnd).as_bool() {
                return Err(CaptureError::WindowGone);
            }
            let mut outer = RECT::default();
            let mut client = RECT::default();
            GetWindowRect(hwnd, &mut outer).map_err(|_| CaptureError::BadGeometry)?;
            GetClientRect(hwnd, &mut client).map_err(|_| CaptureError::BadGeometry)?;
            Ok(WindowGeometry::with_borders(
                (
                    outer.left,
                    outer.top,
                    outer.right - outer.left,
                    outer.bottom - outer.top,
                ),
                (client.right - client.left, client.bottom - client.top),
            ))
        }
    }

    fn ensure_surface(&mut self, w: i32, h: i32) -> Result<(), CaptureError> {
        if let Some(s) = &self.surface {
            if s.w == w && s.h == h {
                return Ok(());
            }
        }
        self.drop_surface();
        unsafe {
            let hwnd = self.hwnd();
            let win_dc = GetWindowDC(hwnd);
            if win_dc.is_invalid() {
                return Err(CaptureError::WindowGone);
            }
            let mem_dc = CreateCompatibleDC(win_dc);
            let bitmap = CreateCompatibleBitmap(win_dc, w, h);
            if mem_dc.is_invalid() || bitmap.is_invalid() {
                let _ = DeleteDC(mem_dc);
                ReleaseDC(hwnd, win_dc);
                return Err(CaptureError::BlitFailed);
            }
            SelectObject(mem_dc, bitmap.into());
            self.surface = Some(BlitSurface {
                win_dc,
                mem_dc,
                bitmap,
                w,
                h,
            });
        }
        Ok(())
    }

    fn drop_surface(&mut self) {
        if let Some(s) = self.surface.take() {
            unsafe {
                let _ = DeleteObject(s.bitmap.into());
                let _ = DeleteDC(s.mem_dc);
                ReleaseDC(self.hwnd(), s.win_dc);
            }
        }
    }

    fn read_bits(mem_dc: HDC, bitmap: HBITMAP, w: i32, h: i32) -> Result<RawCapture, CaptureError> {
        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: w,
            biHeight: -h, // top-down rows
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };
        let mut data = vec![0u8; (w * h * 4) as usize];
        let got = unsafe {
            GetDIBits(
                mem_dc,
                bitmap,
                0,
                h as u32,
                Some(data.as_mut_ptr() as *mut c_void),
                &mut bmi,
                DIB_RGB_COLORS,
            )
        };
        if got == 0 {
            return Err(CaptureError::ReadbackFailed);
        }
        Ok(RawCapture {
            data,
            width: w as u32,
            height: h as u32,
            bytes_per_row: (w * 4) as u32,
        })
    }
}

impl Drop for WindowsWindow {
    fn drop(&mut self) {
        self.drop_surface();
    }
}

impl WindowBackend for WindowsWindow {
    fn id(&self) -> WindowId {
        self.window_id
    }

    fn is_valid(&self) -> bool {
        unsafe { IsWindow(self.hwnd()).as_bool() }
    }

    fn geometry(&mut self) -> Result<WindowGeometry, CaptureError> {
        self.query_geometry()
    }

    fn capture_full(&mut self, y_shift: i32) -> Result<RawCapture, CaptureError> {
        let g = self.query_geometry()?;
        if g.client_w <= 0 || g.client_h <= 0 {
            return Err(CaptureError::BadRect(g.client_w, g.client_h));
        }
        self.ensure_surface(g.client_w, g.client_h)?;
        let s = self.surface.as_ref().ok_or(CaptureError::BlitFailed)?;
        unsafe {
            BitBlt(
                s.mem_dc,
                0,
                0,
                s.w,
                s.h,
                s.win_dc,
                g.border_l,
                g.border_t + y_shift,
                SRCCOPY,
            )
            .map_err(|_| CaptureError::BlitFailed)?;
        }
        Self::read_bits(s.mem_dc, s.bitmap, s.w, s.h)
    }

    fn capture_region(&mut self, rect: Rect, y_shift: i32) -> Result<RawCapture, CaptureError> {
        if rect.w <= 0 || rect.h <= 0 {
            return Err(CaptureError::BadRect(rect.w, rect.h));
        }
        let g = self.query_geometry()?;
        unsafe {
            let hwnd = self.hwnd();
            let win_dc = GetWindowDC(hwnd);
            if win_dc.is_invalid() {
                return Err(CaptureError::WindowGone);
            }
            let mem_dc = CreateCompatibleDC(win_dc);
            let bitmap = CreateCompatibleBitmap(win_dc, rect.w, rect.h);
            let result = if mem_dc.is_invalid() || bitmap.is_invalid() {
                Err(CaptureError::BlitFailed)
            } else {
                SelectObject(mem_dc, bitmap.into());
                BitBlt(
                    mem_dc,
                    0,
                    0,
                    rect.w,
                    rect.h,
                    win_dc,
                    g.border_l + rect.l,
                    g.border_t + rect.t + y_shift,
                    SRCCOPY,
                )
                .map_err(|_| CaptureError::BlitFailed)
                .and_then(|_| Self::read_bits(mem_dc, bitmap, rect.w, rect.h))
            };
            let _ = DeleteObject(bitmap.into());
            let _ = DeleteDC(mem_dc);
            ReleaseDC(hwnd, win_dc);
            result
        }
    }

    fn reset_capture(&mut self) {
        self.drop_surface();
    }

    fn client_to_screen(&self, p: Point) -> Result<Point, InputError> {
        unsafe {
            let hwnd = self.hwnd();
            if !IsWindow(hwnd).as_bool() {
                return Err(InputError::WindowGone);
            }
            let mut pt = POINT { x: p.x, y: p.y };
            if !ClientToScreen(hwnd, &mut pt).as_bool() {
                return Err(InputError::MappingFailed);
            }
            Ok(Point::new(pt.x, pt.y))
        }
    }

    fn screen_size(&self) -> (i32, i32) {
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn set_cursor(&self, screen: Point) -> Result<(), InputError> {
        unsafe { SetCursorPos(screen.x, screen.y).map_err(|_| InputError::PostFailed) }
    }

    fn mouse_button(&self, down: bool) -> Result<(), InputError> {
        unsafe {
            if down {
                mouse_event(MOUSEEVENTF_LEFTDOWN, 0, 0, 0, 0);
            } else {
                mouse_event(MOUSEEVENTF_LEFTUP, 0, 0, 0, 0);
            }
        }
        Ok(())
    }

    fn mouse_move_absolute(&self, nx: i32, ny: i32) -> Result<(), InputError> {
        unsafe {
            mouse_event(MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE, nx, ny, 0, 0);
        }
        Ok(())
    }

    fn post_mouse(&self, msg: MouseMessage, p: Point) -> Result<(), InputError> {
        let hwnd = self.hwnd();
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return Err(InputError::WindowGone);
            }
            let lparam = LPARAM((((p.y as isize) << 16) | (p.x as isize & 0xffff)) as isize);
            let (message, wparam) = match msg {
                MouseMessage::Move => (WM_MOUSEMOVE, WPARAM(0)),
                MouseMessage::LeftDown => (WM_LBUTTONDOWN, WPARAM(MK_LBUTTON)),
                MouseMessage::LeftUp => (WM_LBUTTONUP, WPARAM(0)),
            };
            SendMessageW(hwnd, message, wparam, lparam);
        }
        Ok(())
    }

    fn activate(&mut self) {
        unsafe {
            let hwnd = self.hwnd();
            let _ = ShowWindow(hwnd, SW_RESTORE);
            let _ = SetForegroundWindow(hwnd);
        }
    }
}
